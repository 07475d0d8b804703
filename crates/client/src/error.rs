//! Transport-level errors and validation error payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Field-level validation messages, keyed by form field name.
///
/// Wire shape (HTTP 422): `{"message": "...", "errors": {"name": ["Name is required"]}}`,
/// or the bare `{"name": [...]}` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.0.entry(field.into()).or_default().push(message.into());
        self
    }

    /// Parse a 422 body. Unknown shapes yield an empty map.
    pub fn from_body(body: &Value) -> Self {
        let map = body.get("errors").unwrap_or(body);
        let Some(obj) = map.as_object() else {
            return Self::default();
        };

        let mut errors = BTreeMap::new();
        for (field, messages) in obj {
            let messages: Vec<String> = match messages {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items
                    .iter()
                    .filter_map(|m| m.as_str().map(str::to_string))
                    .collect(),
                _ => continue,
            };
            if !messages.is_empty() {
                errors.insert(field.clone(), messages);
            }
        }
        Self(errors)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// First message for `field`, as shown under the input.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(|m| m.first()).map(String::as_str)
    }

    /// Drop a field's messages once the user edits it.
    pub fn remove(&mut self, field: &str) -> bool {
        self.0.remove(field).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Errors surfaced by the REST transport.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(FieldErrors),
    #[error("not authorized (HTTP {0})")]
    Unauthorized(u16),
    #[error("not found")]
    NotFound,
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// Classify a non-success HTTP response.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::Unauthorized(status),
            404 => Self::NotFound,
            422 => {
                let parsed = serde_json::from_str::<Value>(body).unwrap_or(Value::Null);
                Self::Validation(FieldErrors::from_body(&parsed))
            }
            _ => Self::Api(status, body.to_string()),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Message suitable for a toast.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(_) => "Please correct the highlighted fields.".to_string(),
            Self::Unauthorized(_) => "You are not allowed to do that.".to_string(),
            Self::NotFound => "The record no longer exists.".to_string(),
            Self::Network(_) | Self::Api(..) | Self::Parse(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
