//! JSON schema construction for tool inputs.
//!
//! Every hub describes its input with a `SchemaBuilder`: a required
//! `operation` enum followed by the optional, operation-specific fields.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Fluent builder for an object schema.
///
/// # Example
///
/// ```rust
/// use letta_mcp_tools::SchemaBuilder;
///
/// # fn main() -> Result<(), serde_json::Error> {
/// let schema = SchemaBuilder::new()
///     .enum_values("operation", "Operation to perform", &["list", "get"], true)
///     .string("job_id", "Job identifier", false)
///     .integer("limit", "Maximum number of results", false)
///     .build()?;
///
/// assert_eq!(schema["required"][0], "operation");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    properties: IndexMap<String, JsonValue>,
    required: Vec<String>,
    description: Option<String>,
}

impl SchemaBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn property(mut self, name: &str, schema: JsonValue, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add a string property.
    #[must_use]
    pub fn string(self, name: &str, desc: &str, required: bool) -> Self {
        self.property(
            name,
            serde_json::json!({"type": "string", "description": desc}),
            required,
        )
    }

    /// Add an integer property.
    #[must_use]
    pub fn integer(self, name: &str, desc: &str, required: bool) -> Self {
        self.property(
            name,
            serde_json::json!({"type": "integer", "description": desc}),
            required,
        )
    }

    /// Add a boolean property.
    #[must_use]
    pub fn boolean(self, name: &str, desc: &str, required: bool) -> Self {
        self.property(
            name,
            serde_json::json!({"type": "boolean", "description": desc}),
            required,
        )
    }

    /// Add an array property.
    #[must_use]
    pub fn array(self, name: &str, desc: &str, items: JsonValue, required: bool) -> Self {
        self.property(
            name,
            serde_json::json!({"type": "array", "description": desc, "items": items}),
            required,
        )
    }

    /// Add a string array property.
    #[must_use]
    pub fn string_array(self, name: &str, desc: &str, required: bool) -> Self {
        self.array(name, desc, serde_json::json!({"type": "string"}), required)
    }

    /// Add a free-form object property.
    #[must_use]
    pub fn object(self, name: &str, desc: &str, required: bool) -> Self {
        self.property(
            name,
            serde_json::json!({"type": "object", "description": desc}),
            required,
        )
    }

    /// Add an object property with a nested schema.
    #[must_use]
    pub fn object_with(self, name: &str, desc: &str, schema: JsonValue, required: bool) -> Self {
        let mut schema = schema;
        if let Some(map) = schema.as_object_mut() {
            map.insert("description".to_string(), JsonValue::String(desc.to_string()));
        }
        self.property(name, schema, required)
    }

    /// Add a string enum property.
    #[must_use]
    pub fn enum_values(self, name: &str, desc: &str, values: &[&str], required: bool) -> Self {
        self.property(
            name,
            serde_json::json!({"type": "string", "description": desc, "enum": values}),
            required,
        )
    }

    /// Set the schema description.
    #[must_use]
    pub fn description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Build the schema as JSON.
    pub fn build(self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(ObjectSchema {
            schema_type: "object",
            properties: self.properties,
            required: self.required,
            description: self.description,
        })
    }
}

#[derive(Serialize)]
struct ObjectSchema {
    #[serde(rename = "type")]
    schema_type: &'static str,
    properties: IndexMap<String, JsonValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}
