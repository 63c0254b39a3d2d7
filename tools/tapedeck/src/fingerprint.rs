//! Storage keys for recorded requests.
//!
//! A fingerprint is the unpadded base64url encoding of `"<METHOD> <URL>"`.
//! It is exact rather than hashed, filesystem-safe, and reversible. Neither
//! the method nor the URL is normalized: `get` and `GET` are different keys,
//! as are `?a=1&b=2` and `?b=2&a=1`.

use crate::types::Request;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

pub fn fingerprint(method: &str, url: &str) -> String {
    URL_SAFE_NO_PAD.encode(format!("{method} {url}"))
}

pub fn fingerprint_request(request: &Request) -> String {
    fingerprint(&request.method, &request.url)
}

/// Recover `(method, url)` from a fingerprint produced by [`fingerprint`].
pub fn decode_fingerprint(value: &str) -> Option<(String, String)> {
    let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let (method, url) = text.split_once(' ')?;
    Some((method.to_string(), url.to_string()))
}
