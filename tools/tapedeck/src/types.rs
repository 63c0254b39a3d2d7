use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    #[default]
    Replay,
    Record,
}

impl DispatchMode {
    pub fn parse_cli(value: &str) -> Option<Self> {
        match value {
            "replay" => Some(Self::Replay),
            "record" => Some(Self::Record),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Replay => "replay",
            Self::Record => "record",
        }
    }
}

/// An outgoing request. Only the method and the full URL take part in
/// record lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Request {
    pub method: String,
    pub url: String,
}

impl Request {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }
}

/// Header map with case-insensitive names and one value per name.
///
/// Insertion order is kept so that serialization is stable. Inserting a name
/// that is already present appends the new value with `", "`.
///
/// Only pairs that read back unchanged from a header line are stored: names
/// and values are trimmed, CR and LF in values become spaces, and a name that
/// is empty or contains `:`, CR or LF is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the name is dropped.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name: String = name.into();
        let name = name.trim();
        if name.is_empty() || name.contains([':', '\r', '\n']) {
            return false;
        }
        let value: String = value.into();
        let value = value.replace(['\r', '\n'], " ");
        let value = value.trim();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some((_, current)) => {
                current.push_str(", ");
                current.push_str(value);
            }
            None => self.entries.push((name.to_string(), value.to_string())),
        }
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// A fully buffered response, bound to the request it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub request: Request,
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(request: Request, status: u16) -> Self {
        Self {
            request,
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}
