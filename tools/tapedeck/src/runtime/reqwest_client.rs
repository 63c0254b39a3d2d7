//! Blocking `reqwest` client for record mode.
//!
//! Bodies are fully buffered. Repeated response headers are comma-joined by
//! [`Headers::insert`]; non-UTF-8 header bytes are replaced lossily.

use crate::errors::{TapedeckError, TransportError};
use crate::runtime::HttpClient;
use crate::types::{Headers, Request, Response};

pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, TapedeckError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| TapedeckError::InvalidConfig(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl HttpClient for ReqwestClient {
    fn execute(&self, request: &Request) -> Result<Response, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| TransportError::new(request, e.to_string()))?;
        let res = self
            .client
            .request(method, request.url.as_str())
            .send()
            .map_err(|e| TransportError::new(request, e.to_string()))?;

        let status = res.status().as_u16();
        let mut headers = Headers::new();
        for (name, value) in res.headers() {
            headers.insert(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }
        let body = res
            .bytes()
            .map_err(|e| TransportError::new(request, e.to_string()))?
            .to_vec();

        Ok(Response {
            request: request.clone(),
            status,
            headers,
            body,
        })
    }
}
