//! JSON:API error documents.
//!
//! Clients always receive a structured error array; pointer values are JSON
//! Pointer strings rooted at `/data` so errors map back to form fields.

use serde::{Deserialize, Serialize};

/// Top-level error document: `{ "errors": [ ... ] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
}

impl ErrorDocument {
    pub fn new(errors: Vec<ErrorObject>) -> Self {
        Self { errors }
    }

    pub fn single(error: ErrorObject) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// One member of the `errors` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

impl ErrorObject {
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            detail: detail.into(),
            source: None,
        }
    }

    /// Attach a JSON Pointer into the request body.
    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.source = Some(ErrorSource {
            pointer: Some(pointer.into()),
            parameter: None,
        });
        self
    }

    /// Attach the name of the offending query parameter.
    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.source = Some(ErrorSource {
            pointer: None,
            parameter: Some(parameter.into()),
        });
        self
    }
}

/// Where in the request the error originated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}
