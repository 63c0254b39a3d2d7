use crate::errors::TapedeckError;
use crate::fingerprint::fingerprint_request;
use crate::types::Request;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 4096;

#[derive(Debug, Clone)]
pub struct JsonlLogger {
    pub path: PathBuf,
    pub max_payload_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent<'a> {
    pub level: &'a str,
    pub event_type: &'a str,
    pub payload: Value,
}

impl JsonlLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    pub fn append(&self, event: &LogEvent<'_>) -> Result<(), TapedeckError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| TapedeckError::Io(e.to_string()))?;
        }
        let truncated = truncate_json(event.payload.clone(), self.max_payload_bytes);
        let line = serde_json::to_string(&LogEvent {
            level: event.level,
            event_type: event.event_type,
            payload: truncated,
        })
        .map_err(|e| TapedeckError::Io(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| TapedeckError::Io(e.to_string()))?;
        file.write_all(line.as_bytes())
            .map_err(|e| TapedeckError::Io(e.to_string()))?;
        file.write_all(b"\n")
            .map_err(|e| TapedeckError::Io(e.to_string()))?;
        Ok(())
    }

    /// Records one dispatcher decision. Failures to log are dropped so they
    /// never change the outcome of a request.
    pub fn dispatch_event(
        &self,
        level: &str,
        event_type: &str,
        request: &Request,
        detail: Option<&str>,
    ) {
        let mut payload = json!({
            "method": request.method,
            "url": request.url,
            "fingerprint": fingerprint_request(request),
        });
        if let Some(detail) = detail {
            payload["detail"] = Value::String(detail.to_string());
        }
        let _ = self.append(&LogEvent {
            level,
            event_type,
            payload,
        });
    }
}

fn truncate_json(value: Value, max_bytes: usize) -> Value {
    let rendered = serde_json::to_string(&value).unwrap_or_default();
    if rendered.len() <= max_bytes {
        return value;
    }
    let mut truncated = rendered;
    let mut cut = max_bytes.saturating_sub(3);
    while !truncated.is_char_boundary(cut) {
        cut -= 1;
    }
    truncated.truncate(cut);
    Value::String(format!("{truncated}..."))
}

#[cfg(test)]
mod tests {
    use super::{JsonlLogger, LogEvent};
    use crate::types::Request;
    use serde_json::{json, Value};

    #[test]
    fn logger_truncates_large_payloads_and_writes_jsonl() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs").join("events.jsonl");
        let mut logger = JsonlLogger::new(&path);
        logger.max_payload_bytes = 20;

        logger
            .append(&LogEvent {
                level: "info",
                event_type: "replay_hit",
                payload: json!({"text": "abcdefghijklmnopqrstuvwxyz"}),
            })
            .expect("append");

        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.contains("\"event_type\":\"replay_hit\""));
        assert!(text.contains("..."));
    }

    #[test]
    fn dispatch_event_carries_request_identity() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logger = JsonlLogger::new(dir.path().join("events.jsonl"));
        let request = Request::get("https://example.com/x?q=1");

        logger.dispatch_event("warn", "record_save_failed", &request, Some("disk full"));
        logger.dispatch_event("info", "record_hit", &request, None);

        let text = std::fs::read_to_string(&logger.path).expect("read");
        let lines = text
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).expect("json"))
            .collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event_type"], "record_save_failed");
        assert_eq!(lines[0]["payload"]["detail"], "disk full");
        assert_eq!(
            lines[1]["payload"]["fingerprint"],
            "R0VUIGh0dHBzOi8vZXhhbXBsZS5jb20veD9xPTE"
        );
        assert!(lines[1]["payload"].get("detail").is_none());
    }
}
