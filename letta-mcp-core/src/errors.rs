//! Error types for letta-mcp.
//!
//! Two layers exist:
//!
//! - [`ApiError`]: what the remote call adapter reports when an upstream
//!   request fails (status and body preserved).
//! - [`HubError`]: what a hub dispatch reports to the transport boundary,
//!   wrapping `ApiError` with the context of the operation that failed.

use thiserror::Error;

/// Errors raised by the remote call adapter.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Non-success HTTP status that has no more specific variant.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The requested resource does not exist (404).
    #[error("Not found: {body}")]
    NotFound {
        /// Response body.
        body: String,
    },

    /// Authentication or authorization rejected (401/403).
    #[error("Unauthorized ({status}): {body}")]
    Unauthorized {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The upstream rejected the request payload (400/422).
    #[error("Invalid request ({status}): {body}")]
    InvalidRequest {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The connection could not be established or broke mid-request.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The request did not complete before the client timeout.
    #[error("Request timed out")]
    Timeout,

    /// The response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a non-success status into the matching variant.
    #[must_use]
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            404 => Self::NotFound { body },
            401 | 403 => Self::Unauthorized { status, body },
            400 | 422 => Self::InvalidRequest { status, body },
            _ => Self::Http { status, body },
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a decode error.
    #[must_use]
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// HTTP status carried by this error, if the request got that far.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. }
            | Self::Unauthorized { status, .. }
            | Self::InvalidRequest { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            Self::Connection(_) | Self::Timeout | Self::Decode(_) => None,
        }
    }

    /// Response body, when one was received.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Http { body, .. }
            | Self::NotFound { body }
            | Self::Unauthorized { body, .. }
            | Self::InvalidRequest { body, .. } => Some(body),
            Self::Connection(_) | Self::Timeout | Self::Decode(_) => None,
        }
    }

    /// Whether the caller, not the platform, is at fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Unauthorized { .. } | Self::InvalidRequest { .. }
        )
    }
}

/// Errors produced while dispatching a hub operation.
#[derive(Debug, Error)]
pub enum HubError {
    /// A required argument is absent or falsy.
    #[error("{field} is required for {operation} operation")]
    MissingArgument {
        /// Name of the missing field.
        field: String,
        /// Operation being dispatched.
        operation: String,
    },

    /// The `operation` discriminator does not name a known operation.
    #[error("Unknown operation: {operation}")]
    UnknownOperation {
        /// Tool that received the call.
        tool: String,
        /// The unrecognized operation name.
        operation: String,
    },

    /// No hub is registered under the requested tool name.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Arguments are present but unusable.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The remote call failed.
    #[error("{context}: {source}")]
    Upstream {
        /// What was being attempted, e.g. "Listing agents".
        context: String,
        /// The adapter error.
        #[source]
        source: ApiError,
    },

    /// Startup configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HubError {
    /// Create a missing-argument error.
    #[must_use]
    pub fn missing_argument(field: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::MissingArgument {
            field: field.into(),
            operation: operation.into(),
        }
    }

    /// Create an unknown-operation error.
    #[must_use]
    pub fn unknown_operation(tool: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnknownOperation {
            tool: tool.into(),
            operation: operation.into(),
        }
    }

    /// Create a tool-not-found error.
    #[must_use]
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound(name.into())
    }

    /// Create an invalid-arguments error.
    #[must_use]
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Wrap an adapter error with context.
    #[must_use]
    pub fn upstream(context: impl Into<String>, source: ApiError) -> Self {
        Self::Upstream {
            context: context.into(),
            source,
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// The upstream error, if this is one.
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Upstream { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether this error was raised before any network call.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingArgument { .. }
                | Self::UnknownOperation { .. }
                | Self::ToolNotFound(_)
                | Self::InvalidArguments(_)
        )
    }
}

/// Result type for hub operations.
pub type HubResult<T> = Result<T, HubError>;

/// Extension for attaching operation context to adapter results.
pub trait UpstreamContext<T> {
    /// Wrap the error with a human-readable description of the attempted call.
    fn context(self, context: impl Into<String>) -> HubResult<T>;
}

impl<T> UpstreamContext<T> for Result<T, ApiError> {
    fn context(self, context: impl Into<String>) -> HubResult<T> {
        self.map_err(|e| HubError::upstream(context, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_argument_message() {
        let err = HubError::missing_argument("agent_id", "update");
        assert_eq!(err.to_string(), "agent_id is required for update operation");
        assert!(err.is_validation());
    }

    #[test]
    fn test_unknown_operation_message() {
        let err = HubError::unknown_operation("letta_job_monitor", "explode");
        assert_eq!(err.to_string(), "Unknown operation: explode");
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(ApiError::from_status(404, "x"), ApiError::NotFound { .. }));
        assert!(matches!(
            ApiError::from_status(403, "x"),
            ApiError::Unauthorized { status: 403, .. }
        ));
        assert!(matches!(
            ApiError::from_status(422, "x"),
            ApiError::InvalidRequest { status: 422, .. }
        ));
        assert!(matches!(ApiError::from_status(503, "x"), ApiError::Http { status: 503, .. }));
    }

    #[test]
    fn test_status_and_body() {
        let err = ApiError::from_status(404, "no agent");
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.body(), Some("no agent"));
        assert!(err.is_client_error());

        let err = ApiError::Timeout;
        assert_eq!(err.status(), None);
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_upstream_context() {
        let result: Result<(), ApiError> = Err(ApiError::from_status(500, "boom"));
        let err = result.context("Listing agents").unwrap_err();
        assert_eq!(err.to_string(), "Listing agents: HTTP 500: boom");
        assert_eq!(err.api_error().and_then(ApiError::status), Some(500));
        assert!(!err.is_validation());
    }
}
