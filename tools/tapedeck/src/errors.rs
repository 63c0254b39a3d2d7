use crate::types::Request;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TapedeckError {
    #[error("io error: {0}")]
    Io(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("malformed http message: {0}")]
    MalformedMessage(String),
    #[error("malformed status line: {0:?}")]
    MalformedStatusLine(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("cli error: {0}")]
    Cli(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl TapedeckError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TapedeckError::NotFound(_))
    }
}

/// The only failure an [`HttpClient`](crate::runtime::HttpClient) reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport failure for {} {}: {message}", .request.method, .request.url)]
pub struct TransportError {
    pub request: Request,
    pub message: String,
}

impl TransportError {
    pub fn new(request: &Request, message: impl Into<String>) -> Self {
        Self {
            request: request.clone(),
            message: message.into(),
        }
    }
}
