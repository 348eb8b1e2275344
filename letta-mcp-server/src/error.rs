//! Server errors and the mapping from hub failures to JSON-RPC errors.

use letta_mcp_core::HubError;
use serde_json::{json, Value as JsonValue};
use thiserror::Error;

use crate::types::JsonRpcError;

/// Errors that stop a transport.
#[derive(Debug, Error)]
pub enum McpError {
    /// The listener could not bind.
    #[error("Failed to bind to address: {0}")]
    Bind(String),

    /// The HTTP server stopped with an error.
    #[error("Server error: {0}")]
    Serve(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for transport operations.
pub type McpResult<T> = Result<T, McpError>;

impl From<&HubError> for JsonRpcError {
    /// Validation failures are the caller's fault (`-32602`). Upstream
    /// failures map to `-32600` when the platform rejected the request and
    /// `-32603` otherwise, carrying `{status, body}` as data.
    fn from(err: &HubError) -> Self {
        let message = err.to_string();
        if err.is_validation() {
            return Self::new(Self::INVALID_PARAMS, message);
        }
        match err.api_error() {
            Some(api) => {
                let code = if api.is_client_error() {
                    Self::INVALID_REQUEST
                } else {
                    Self::INTERNAL_ERROR
                };
                let data = json!({
                    "status": api.status(),
                    "body": api.body().map_or(JsonValue::Null, body_value),
                });
                Self::new(code, message).with_data(data)
            }
            None => Self::new(Self::INTERNAL_ERROR, message),
        }
    }
}

// JSON bodies are forwarded structured, anything else as text.
fn body_value(body: &str) -> JsonValue {
    serde_json::from_str(body).unwrap_or_else(|_| JsonValue::String(body.to_string()))
}
