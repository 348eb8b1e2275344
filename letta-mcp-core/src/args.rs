//! Argument validation.
//!
//! Required fields use "falsy" semantics: a field counts as missing when it
//! is absent, `null`, an empty string, the number zero, or `false`. Fields
//! are checked in declaration order so the reported field is deterministic.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::errors::{HubError, HubResult};

/// Name of the discriminator field on every hub request.
pub const OPERATION_FIELD: &str = "operation";

/// Whether a JSON value is falsy.
///
/// Objects and arrays are never falsy, even when empty.
#[must_use]
pub fn is_falsy(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::Bool(b)) => !b,
        Some(JsonValue::String(s)) => s.is_empty(),
        Some(JsonValue::Number(n)) => n.as_f64().map_or(false, |f| f == 0.0),
        Some(JsonValue::Array(_)) | Some(JsonValue::Object(_)) => false,
    }
}

/// Check `required` fields of `args` in order, failing on the first falsy one.
pub fn validate_required(args: &JsonValue, required: &[&str], operation: &str) -> HubResult<()> {
    match required.iter().find(|field| is_falsy(args.get(**field))) {
        Some(field) => Err(HubError::missing_argument(*field, operation)),
        None => Ok(()),
    }
}

/// Read the operation discriminator.
pub fn operation_name(args: &JsonValue) -> HubResult<&str> {
    match args.get(OPERATION_FIELD) {
        Some(JsonValue::String(op)) if !op.is_empty() => Ok(op),
        Some(JsonValue::String(_)) | Some(JsonValue::Null) | None => {
            Err(HubError::invalid_args("operation is required"))
        }
        Some(other) => Err(HubError::invalid_args(format!(
            "operation must be a string, got {other}"
        ))),
    }
}

/// Decode validated arguments into a typed request.
pub fn decode<T: DeserializeOwned>(args: JsonValue, operation: &str) -> HubResult<T> {
    serde_json::from_value(args)
        .map_err(|e| HubError::invalid_args(format!("{operation} operation: {e}")))
}

/// Borrow a required string field from a decoded request.
///
/// Decoded requests keep every field optional; this repeats the falsy check
/// so handlers never need to unwrap.
pub fn required<'a>(value: &'a Option<String>, field: &str, operation: &str) -> HubResult<&'a str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(HubError::missing_argument(field, operation)),
    }
}

/// Borrow a required JSON field from a decoded request.
pub fn required_value<'a>(
    value: &'a Option<JsonValue>,
    field: &str,
    operation: &str,
) -> HubResult<&'a JsonValue> {
    match value {
        Some(v) if !is_falsy(Some(v)) => Ok(v),
        _ => Err(HubError::missing_argument(field, operation)),
    }
}
