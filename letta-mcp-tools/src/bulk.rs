//! Client-side agent selection and per-item batch reporting.
//!
//! Bulk operations fetch the full agent list, select matches with an
//! [`AgentFilter`], then act on each match one at a time. A failed item is
//! recorded in the [`BatchReport`] and the loop moves on.

use letta_mcp_core::normalize::{aliases, resolve_alias, str_field};
use letta_mcp_core::ApiError;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

/// Predicates selecting agents for a bulk operation.
///
/// An agent matches when it satisfies any populated predicate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentFilter {
    /// Exact agent ids.
    #[serde(default)]
    pub agent_ids: Vec<String>,
    /// Case-insensitive substring of the agent name.
    #[serde(default)]
    pub agent_name_filter: Option<String>,
    /// Tag the agent must carry.
    #[serde(default)]
    pub agent_tag_filter: Option<String>,
}

impl AgentFilter {
    /// Whether no predicate is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agent_ids.is_empty()
            && self.agent_name_filter.as_deref().map_or(true, str::is_empty)
            && self.agent_tag_filter.as_deref().map_or(true, str::is_empty)
    }

    /// Whether `agent` is selected.
    #[must_use]
    pub fn matches(&self, agent: &JsonValue) -> bool {
        let id = str_field(agent, "id");
        if id.map_or(false, |id| self.agent_ids.iter().any(|wanted| wanted == id)) {
            return true;
        }

        if let Some(needle) = self.agent_name_filter.as_deref().filter(|s| !s.is_empty()) {
            let name = resolve_alias(agent, &aliases::NAME).and_then(JsonValue::as_str);
            if name.map_or(false, |n| n.to_lowercase().contains(&needle.to_lowercase())) {
                return true;
            }
        }

        if let Some(tag) = self.agent_tag_filter.as_deref().filter(|s| !s.is_empty()) {
            let tagged = agent
                .get("tags")
                .and_then(JsonValue::as_array)
                .map_or(false, |tags| tags.iter().any(|t| t.as_str() == Some(tag)));
            if tagged {
                return true;
            }
        }

        false
    }

    /// Select matching agents, preserving upstream order.
    #[must_use]
    pub fn select<'a>(&self, agents: &'a [JsonValue]) -> Vec<&'a JsonValue> {
        agents.iter().filter(|agent| self.matches(agent)).collect()
    }
}

/// Per-item outcome of a bulk operation.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    results: Vec<JsonValue>,
    succeeded: usize,
    failed: usize,
}

impl BatchReport {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for one item.
    pub fn record<T>(&mut self, id: &str, outcome: &Result<T, ApiError>) {
        match outcome {
            Ok(_) => {
                self.succeeded += 1;
                self.results.push(json!({"id": id, "success": true}));
            }
            Err(err) => {
                self.failed += 1;
                self.results
                    .push(json!({"id": id, "success": false, "error": err.to_string()}));
            }
        }
    }

    /// Number of successful items.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// Number of failed items.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Per-item results in processing order.
    #[must_use]
    pub fn into_results(self) -> Vec<JsonValue> {
        self.results
    }
}
