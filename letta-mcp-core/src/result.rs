//! The canonical result returned by every hub operation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::errors::HubResult;

/// Normalized outcome of one operation.
///
/// Serializes flat: `{"success": .., "operation": .., "message": .., <payload>}`.
///
/// # Example
///
/// ```rust
/// use letta_mcp_core::CanonicalResult;
/// use serde_json::json;
///
/// let result = CanonicalResult::ok("list")
///     .with_message("Found 1 jobs")
///     .with_items("jobs", vec![json!({"id": "job-1"})]);
///
/// assert_eq!(result.get("count"), Some(&json!(1)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Operation name.
    pub operation: String,
    /// Human-readable outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Operation-specific fields.
    #[serde(flatten)]
    pub payload: IndexMap<String, JsonValue>,
}

impl CanonicalResult {
    /// Create a successful result.
    #[must_use]
    pub fn ok(operation: impl Into<String>) -> Self {
        Self {
            success: true,
            operation: operation.into(),
            message: None,
            payload: IndexMap::new(),
        }
    }

    /// Create an unsuccessful result that is still reported as data.
    #[must_use]
    pub fn failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            operation: operation.into(),
            message: Some(message.into()),
            payload: IndexMap::new(),
        }
    }

    /// Set the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the success flag.
    #[must_use]
    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    /// Add a payload field. `null` values are skipped.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.payload.insert(key.into(), value);
        }
        self
    }

    /// Add a payload field only when present.
    #[must_use]
    pub fn with_opt(self, key: impl Into<String>, value: Option<impl Into<JsonValue>>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    /// Add a list under `key` along with its `count`.
    #[must_use]
    pub fn with_items(mut self, key: impl Into<String>, items: Vec<JsonValue>) -> Self {
        let count = items.len();
        self.payload.insert(key.into(), JsonValue::Array(items));
        self.payload.insert("count".to_string(), JsonValue::from(count));
        self
    }

    /// Get a payload field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.payload.get(key)
    }

    /// Render as the pretty JSON text placed in the protocol envelope.
    pub fn to_json_string(&self) -> HubResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
