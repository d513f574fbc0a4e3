//! Captured request and response bodies.

use std::fmt;

use bytes::Bytes;
use serde_json::Value;

/// A body as interpreted by the proxy.
///
/// WebDriver bodies are JSON, but the proxy never rejects one that isn't:
/// anything that fails to parse is kept as text.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Json(Value),
    Text(String),
}

impl Payload {
    /// Interpret raw bytes, falling back to (lossy) text when not JSON.
    pub fn parse(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Payload::Empty;
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Look up a top-level field of a JSON object body.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_json().and_then(|v| v.get(key))
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => Ok(()),
            Payload::Json(value) => write!(f, "{}", value),
            Payload::Text(text) => f.write_str(text),
        }
    }
}

/// Raw bytes of a body together with their interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedBody {
    raw: Bytes,
    payload: Payload,
}

impl CapturedBody {
    pub fn new(raw: Bytes) -> Self {
        let payload = Payload::parse(&raw);
        Self { raw, payload }
    }

    /// Exactly the bytes that crossed the wire.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn json(&self) -> Option<&Value> {
        self.payload.as_json()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}
