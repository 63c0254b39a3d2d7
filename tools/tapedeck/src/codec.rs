//! Byte-exact HTTP/1.1 wire format for recorded responses.
//!
//! ```text
//! HTTP/1.1 <status>\r\n
//! <name>: <value>\r\n      one line per header
//! \r\n
//! <body bytes>
//! ```
//!
//! Only the head is treated as text. The body is copied verbatim in both
//! directions and may itself contain `\r\n\r\n`.

use crate::errors::TapedeckError;
use crate::types::{Headers, Request, Response};

const SEPARATOR: &[u8] = b"\r\n\r\n";

pub fn serialize(response: &Response) -> Vec<u8> {
    let mut head = format!("HTTP/1.1 {:03}\r\n", response.status);
    for (name, value) in response.headers.iter() {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");

    let mut out = Vec::with_capacity(head.len() + response.body.len());
    out.extend_from_slice(head.as_bytes());
    out.extend_from_slice(&response.body);
    out
}

pub fn deserialize(bytes: &[u8], request: &Request) -> Result<Response, TapedeckError> {
    let split = bytes
        .windows(SEPARATOR.len())
        .position(|window| window == SEPARATOR)
        .ok_or_else(|| {
            TapedeckError::MalformedMessage("missing header/body separator".to_string())
        })?;
    let head = std::str::from_utf8(&bytes[..split])
        .map_err(|e| TapedeckError::MalformedMessage(format!("head is not utf-8: {e}")))?;
    let body = bytes[split + SEPARATOR.len()..].to_vec();

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let status = parse_status_line(status_line)
        .ok_or_else(|| TapedeckError::MalformedStatusLine(status_line.to_string()))?;

    let mut headers = Headers::new();
    for line in lines {
        if let Some((name, value)) = parse_header_line(line) {
            headers.insert(name, value);
        }
    }

    Ok(Response {
        request: request.clone(),
        status,
        headers,
        body,
    })
}

/// Accepts `HTTP/<d>.<d> <ddd>` optionally followed by ` <reason phrase>`.
fn parse_status_line(line: &str) -> Option<u16> {
    let rest = line.strip_prefix("HTTP/")?;
    let bytes = rest.as_bytes();
    if bytes.len() < 7
        || !bytes[0].is_ascii_digit()
        || bytes[1] != b'.'
        || !bytes[2].is_ascii_digit()
        || bytes[3] != b' '
        || !bytes[4..7].iter().all(u8::is_ascii_digit)
    {
        return None;
    }
    if bytes.len() > 7 && bytes[7] != b' ' {
        return None;
    }
    rest[4..7].parse::<u16>().ok()
}

/// Lines without a colon, or starting with one, are not headers and are skipped.
fn parse_header_line(line: &str) -> Option<(&str, &str)> {
    match line.find(':') {
        Some(idx) if idx > 0 => Some((line[..idx].trim(), line[idx + 1..].trim())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{deserialize, parse_status_line, serialize};
    use crate::errors::TapedeckError;
    use crate::types::{Request, Response};

    fn request() -> Request {
        Request::get("https://example.com/x?q=1")
    }

    #[test]
    fn serializes_status_headers_and_body() {
        let response = Response::new(request(), 200)
            .with_header("Content-Type", "application/json")
            .with_body(r#"{"a":1}"#);
        assert_eq!(
            serialize(&response),
            b"HTTP/1.1 200\r\nContent-Type: application/json\r\n\r\n{\"a\":1}".to_vec()
        );
    }

    #[test]
    fn serializes_empty_response() {
        let response = Response::new(request(), 204);
        assert_eq!(serialize(&response), b"HTTP/1.1 204\r\n\r\n".to_vec());
    }

    #[test]
    fn header_values_are_emitted_verbatim() {
        let response = Response::new(request(), 200)
            .with_header("Set-Cookie", "a=\"quoted; value\"; Path=/");
        let text = String::from_utf8(serialize(&response)).expect("utf8");
        assert!(text.contains("Set-Cookie: a=\"quoted; value\"; Path=/\r\n"));
    }

    #[test]
    fn round_trip_preserves_status_headers_and_body() {
        let original = Response::new(request(), 418)
            .with_header("Content-Type", "text/plain")
            .with_header("X-Request-Id", "abc-123")
            .with_body("short and stout");
        let decoded = deserialize(&serialize(&original), &request()).expect("decode");
        assert_eq!(decoded, original);
    }

    #[test]
    fn body_may_contain_the_separator_and_binary_bytes() {
        let mut body = b"first\r\n\r\nsecond".to_vec();
        body.extend_from_slice(&[0, 159, 146, 150, 255]);
        let original = Response::new(request(), 200).with_body(body.clone());
        let decoded = deserialize(&serialize(&original), &request()).expect("decode");
        assert_eq!(decoded.body, body);
    }

    #[test]
    fn decoded_response_is_bound_to_given_request() {
        let other = Request::new("POST", "https://example.com/other");
        let decoded = deserialize(b"HTTP/1.1 201\r\n\r\n", &other).expect("decode");
        assert_eq!(decoded.request, other);
        assert_eq!(decoded.status, 201);
        assert!(decoded.body.is_empty());
    }

    #[test]
    fn missing_separator_is_malformed_message() {
        let err = deserialize(b"HTTP/1.1 200\r\nContent-Type: text/plain\r\n", &request())
            .expect_err("must fail");
        assert!(matches!(err, TapedeckError::MalformedMessage(_)));
    }

    #[test]
    fn bad_status_line_names_the_line() {
        let err = deserialize(b"HTTP/1.1 OK\r\n\r\nbody", &request()).expect_err("must fail");
        assert_eq!(err, TapedeckError::MalformedStatusLine("HTTP/1.1 OK".to_string()));
    }

    #[test]
    fn non_utf8_head_is_malformed_message() {
        let err = deserialize(b"HTTP/1.1 200\r\nX: \xff\r\n\r\n", &request()).expect_err("fail");
        assert!(matches!(err, TapedeckError::MalformedMessage(_)));
    }

    #[test]
    fn status_line_accepts_reason_phrase_and_other_versions() {
        assert_eq!(parse_status_line("HTTP/1.1 200"), Some(200));
        assert_eq!(parse_status_line("HTTP/1.0 404 Not Found"), Some(404));
        assert_eq!(parse_status_line("HTTP/2.0 503 Service Unavailable"), Some(503));
    }

    #[test]
    fn status_line_rejects_malformed_input() {
        assert_eq!(parse_status_line(""), None);
        assert_eq!(parse_status_line("HTTP/1.1"), None);
        assert_eq!(parse_status_line("HTTP/11 200"), None);
        assert_eq!(parse_status_line("HTTPS/1.1 200"), None);
        assert_eq!(parse_status_line("HTTP/1.1 20"), None);
        assert_eq!(parse_status_line("HTTP/1.1 2000"), None);
        assert_eq!(parse_status_line("HTTP/1.1 200OK"), None);
    }

    #[test]
    fn any_three_digit_status_round_trips() {
        assert_eq!(parse_status_line("HTTP/1.1 099"), Some(99));
        assert_eq!(parse_status_line("HTTP/1.1 799 Custom"), Some(799));
        for status in [0u16, 99, 600, 799, 999] {
            let response = Response::new(request(), status).with_body("x");
            let decoded = deserialize(&serialize(&response), &request()).expect("decode");
            assert_eq!(decoded, response);
        }
    }

    #[test]
    fn hostile_header_input_still_round_trips() {
        let response = Response::new(request(), 200)
            .with_header("", "dropped")
            .with_header("X-Split:Name", "dropped")
            .with_header(" X-Value ", " first\r\nSet-Cookie: injected ")
            .with_body("ok");
        let bytes = serialize(&response);
        assert_eq!(
            bytes,
            b"HTTP/1.1 200\r\nX-Value: first  Set-Cookie: injected\r\n\r\nok".to_vec()
        );
        assert_eq!(deserialize(&bytes, &request()).expect("decode"), response);
    }

    #[test]
    fn header_lines_are_trimmed_and_lenient() {
        let raw = b"HTTP/1.1 200 OK\r\n  X-Padded  :   spaced value  \r\nno colon here\r\n: leading colon\r\nX-Url: http://a.b/c\r\n\r\n";
        let decoded = deserialize(raw, &request()).expect("decode");
        assert_eq!(decoded.headers.len(), 2);
        assert_eq!(decoded.headers.get("x-padded"), Some("spaced value"));
        assert_eq!(decoded.headers.get("X-Url"), Some("http://a.b/c"));
    }
}
