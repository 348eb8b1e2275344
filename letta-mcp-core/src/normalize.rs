//! Response normalization.
//!
//! Upstream list endpoints answer with either a bare array or an object that
//! wraps the array under a named key, and field names drift between endpoint
//! versions. The helpers here turn those shapes into one canonical form:
//!
//! - [`extract_list`] accepts both shapes and never fails on a missing list.
//! - [`Alias`] records the preference order for a canonical field once;
//!   [`resolve_alias`] applies it.
//! - [`project`] trims an entity to a fixed allow-list of [`Field`]s.
//! - [`strip_fields`] removes large payloads such as embeddings.

use serde_json::{Map, Value as JsonValue};

/// Ordered fallback keys for one canonical field. The first non-null key wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alias {
    /// Name the value is emitted under.
    pub canonical: &'static str,
    /// Upstream keys, most preferred first.
    pub keys: &'static [&'static str],
}

impl Alias {
    /// Create an alias entry.
    #[must_use]
    pub const fn new(canonical: &'static str, keys: &'static [&'static str]) -> Self {
        Self { canonical, keys }
    }
}

/// Alias preference lists shared by every hub.
pub mod aliases {
    use super::Alias;

    /// `message_type`, then `type`.
    pub const MESSAGE_TYPE: Alias = Alias::new("message_type", &["message_type", "type"]);
    /// `content`, then `text`.
    pub const CONTENT: Alias = Alias::new("content", &["content", "text"]);
    /// `timestamp`, then `created_at`, then `date`.
    pub const TIMESTAMP: Alias = Alias::new("timestamp", &["timestamp", "created_at", "date"]);
    /// `name`, then `agent_name`.
    pub const NAME: Alias = Alias::new("name", &["name", "agent_name"]);
    /// `filename`, then `file_name`, then `name`.
    pub const FILENAME: Alias = Alias::new("filename", &["filename", "file_name", "name"]);
    /// `size`, then `file_size`.
    pub const SIZE: Alias = Alias::new("size", &["size", "file_size"]);
    /// `mime_type`, then `file_type`.
    pub const MIME_TYPE: Alias = Alias::new("mime_type", &["mime_type", "file_type"]);
    /// `opened_at`, then `last_accessed_at`.
    pub const OPENED_AT: Alias = Alias::new("opened_at", &["opened_at", "last_accessed_at"]);
}

/// One entry of an entity allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Copied under its own name.
    Plain(&'static str),
    /// Resolved through an alias chain.
    Aliased(Alias),
}

impl Field {
    /// Name the field is emitted under.
    #[must_use]
    pub fn canonical(&self) -> &'static str {
        match self {
            Self::Plain(name) => name,
            Self::Aliased(alias) => alias.canonical,
        }
    }

    fn lookup<'a>(&self, item: &'a JsonValue) -> Option<&'a JsonValue> {
        match self {
            Self::Plain(name) => item.get(*name).filter(|v| !v.is_null()),
            Self::Aliased(alias) => resolve_alias(item, alias),
        }
    }
}

/// Resolve a canonical field through its alias list.
#[must_use]
pub fn resolve_alias<'a>(item: &'a JsonValue, alias: &Alias) -> Option<&'a JsonValue> {
    alias
        .keys
        .iter()
        .filter_map(|key| item.get(*key))
        .find(|value| !value.is_null())
}

/// Pull the item list out of an upstream list response.
///
/// A bare array is returned as-is. An object is searched for the first key in
/// `wrapper_keys` holding an array. Anything else yields an empty list.
#[must_use]
pub fn extract_list(raw: JsonValue, wrapper_keys: &[&str]) -> Vec<JsonValue> {
    match raw {
        JsonValue::Array(items) => items,
        JsonValue::Object(mut map) => wrapper_keys
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(JsonValue::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Trim an entity to `fields`, resolving aliases and dropping absent values.
///
/// Non-object input is returned unchanged.
#[must_use]
pub fn project(item: &JsonValue, fields: &[Field]) -> JsonValue {
    if !item.is_object() {
        return item.clone();
    }
    let mut out = Map::new();
    for field in fields {
        if let Some(value) = field.lookup(item) {
            out.insert(field.canonical().to_string(), value.clone());
        }
    }
    JsonValue::Object(out)
}

/// Project every item of a list.
#[must_use]
pub fn project_all(items: &[JsonValue], fields: &[Field]) -> Vec<JsonValue> {
    items.iter().map(|item| project(item, fields)).collect()
}

/// Remove `fields` from an object in place.
pub fn strip_fields(item: &mut JsonValue, fields: &[&str]) {
    if let Some(map) = item.as_object_mut() {
        for field in fields {
            map.remove(*field);
        }
    }
}

/// Read a string field, treating empty strings as absent.
#[must_use]
pub fn str_field<'a>(item: &'a JsonValue, key: &str) -> Option<&'a str> {
    item.get(key).and_then(JsonValue::as_str).filter(|s| !s.is_empty())
}
