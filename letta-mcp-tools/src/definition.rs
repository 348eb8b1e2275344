//! Tool definitions advertised to MCP clients.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Static metadata for one tool, generated once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON schema of the `arguments` object.
    pub input_schema: JsonValue,
}

impl ToolDefinition {
    /// Create a definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: JsonValue,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Operation names listed in the schema's `operation` enum.
    #[must_use]
    pub fn operations(&self) -> Vec<&str> {
        self.input_schema["properties"]["operation"]["enum"]
            .as_array()
            .map(|ops| ops.iter().filter_map(JsonValue::as_str).collect())
            .unwrap_or_default()
    }
}
