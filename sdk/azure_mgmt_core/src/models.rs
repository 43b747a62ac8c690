//! Common types shared across all Resource Manager crates.

use serde::{Deserialize, Serialize};

/// The error body returned by Resource Manager, `{"error": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ResponseError,
}

/// Error details reported by the service.
///
/// Used both for failed HTTP exchanges and for long-running operations that
/// end in the `Failed` state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseError {
    /// Machine-readable error code.
    #[serde(default)]
    pub code: Option<String>,

    /// Human-readable description.
    #[serde(default)]
    pub message: Option<String>,

    /// The target of the error, usually a property name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Nested errors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ResponseError>,

    /// Additional service-specific information.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_info: Vec<serde_json::Value>,
}

impl ResponseError {
    /// Extract an error payload from a response body.
    ///
    /// Accepts both the wrapped form `{"error": {...}}` and a bare
    /// `{"code": ..., "message": ...}` object.
    pub fn from_value(body: &serde_json::Value) -> Option<Self> {
        let candidate = body.get("error").unwrap_or(body);
        if !candidate.is_object() {
            return None;
        }
        let error: Self = serde_json::from_value(candidate.clone()).ok()?;
        if error.code.is_none() && error.message.is_none() {
            return None;
        }
        Some(error)
    }

    /// The error code, or `"Unknown"` when the service omitted it.
    pub fn code_or_unknown(&self) -> &str {
        self.code.as_deref().unwrap_or("Unknown")
    }
}
