use serde::{Serialize, Deserialize};
use serde_json::Value;

/// Caller-supplied generation payload.
///
/// `contents` is passed to the upstream API untouched; the relay never
/// looks inside it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GenerationRequest {
    pub contents: Value,
}

impl GenerationRequest {
    pub fn new(contents: Value) -> Self {
        Self { contents }
    }

    /// Extracts the request from an inbound JSON body.
    ///
    /// Returns `None` when `contents` is missing or null.
    pub fn from_body(body: &Value) -> Option<Self> {
        match body.get("contents") {
            None | Some(Value::Null) => None,
            Some(contents) => Some(Self::new(contents.clone())),
        }
    }
}
