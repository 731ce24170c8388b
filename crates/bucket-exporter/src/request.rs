use serde::Deserialize;

use crate::Result;

/// Invocation payload: `{"bucket": "...", "prefix": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Request {
    pub bucket: String,
    pub prefix: String,
}

impl Request {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn from_value(payload: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(payload)?)
    }
}
