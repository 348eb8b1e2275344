//! Entity allow-lists.
//!
//! These lists are part of each tool's output contract: a remote entity is
//! always reduced to exactly these fields (when present upstream).

use letta_mcp_core::normalize::{aliases, project, project_all, strip_fields, Field};
use serde_json::Value as JsonValue;

/// Agent fields returned by list operations.
pub const AGENT_SUMMARY: &[Field] = &[
    Field::Plain("id"),
    Field::Aliased(aliases::NAME),
    Field::Plain("description"),
    Field::Plain("agent_type"),
    Field::Plain("tags"),
    Field::Plain("created_at"),
    Field::Plain("updated_at"),
];

/// Agent fields returned by single-agent operations. `tools` is reduced
/// separately by [`agent_detail`].
pub const AGENT_DETAIL: &[Field] = &[
    Field::Plain("id"),
    Field::Aliased(aliases::NAME),
    Field::Plain("description"),
    Field::Plain("agent_type"),
    Field::Plain("tags"),
    Field::Plain("created_at"),
    Field::Plain("updated_at"),
    Field::Plain("system"),
    Field::Plain("llm_config"),
    Field::Plain("embedding_config"),
];

/// Message fields.
pub const MESSAGE: &[Field] = &[
    Field::Plain("id"),
    Field::Aliased(aliases::MESSAGE_TYPE),
    Field::Plain("role"),
    Field::Aliased(aliases::CONTENT),
    Field::Aliased(aliases::TIMESTAMP),
    Field::Plain("tool_call"),
    Field::Plain("tool_return"),
];

/// Tool fields returned by list operations.
pub const TOOL_SUMMARY: &[Field] = &[
    Field::Plain("id"),
    Field::Plain("name"),
    Field::Plain("description"),
    Field::Plain("tool_type"),
    Field::Plain("tags"),
];

/// Tool fields returned by single-tool operations.
pub const TOOL_DETAIL: &[Field] = &[
    Field::Plain("id"),
    Field::Plain("name"),
    Field::Plain("description"),
    Field::Plain("tool_type"),
    Field::Plain("tags"),
    Field::Plain("source_type"),
    Field::Plain("json_schema"),
    Field::Plain("return_char_limit"),
    Field::Plain("source_code"),
];

/// Memory block fields.
pub const BLOCK: &[Field] = &[
    Field::Plain("id"),
    Field::Plain("label"),
    Field::Plain("value"),
    Field::Plain("limit"),
    Field::Plain("description"),
];

/// Archival passage fields. `embedding` is stripped unless requested.
pub const PASSAGE: &[Field] = &[
    Field::Plain("id"),
    Field::Aliased(aliases::CONTENT),
    Field::Aliased(aliases::TIMESTAMP),
    Field::Plain("agent_id"),
    Field::Plain("embedding"),
];

/// Data source fields.
pub const SOURCE: &[Field] = &[
    Field::Plain("id"),
    Field::Plain("name"),
    Field::Plain("description"),
    Field::Plain("created_at"),
    Field::Plain("updated_at"),
];

/// Source file fields. `content` is stripped unless requested.
pub const SOURCE_FILE: &[Field] = &[
    Field::Plain("id"),
    Field::Aliased(aliases::FILENAME),
    Field::Aliased(aliases::SIZE),
    Field::Aliased(aliases::MIME_TYPE),
    Field::Plain("processing_status"),
    Field::Plain("created_at"),
    Field::Plain("content"),
];

/// Job fields.
pub const JOB: &[Field] = &[
    Field::Plain("id"),
    Field::Plain("status"),
    Field::Plain("job_type"),
    Field::Plain("created_at"),
    Field::Plain("completed_at"),
    Field::Plain("metadata"),
];

/// Agent-attached file fields.
pub const FILE: &[Field] = &[
    Field::Plain("id"),
    Field::Aliased(aliases::FILENAME),
    Field::Aliased(aliases::SIZE),
    Field::Aliased(aliases::MIME_TYPE),
    Field::Plain("is_open"),
    Field::Aliased(aliases::OPENED_AT),
];

/// Folder fields.
pub const FOLDER: &[Field] = &[
    Field::Plain("id"),
    Field::Plain("name"),
    Field::Plain("description"),
    Field::Plain("file_count"),
    Field::Plain("agent_count"),
];

/// Asynchronous run fields.
pub const RUN: &[Field] = &[
    Field::Plain("id"),
    Field::Plain("status"),
    Field::Plain("created_at"),
];

/// `{id, name}` reference.
pub const REFERENCE: &[Field] = &[Field::Plain("id"), Field::Aliased(aliases::NAME)];

/// Reduce an agent to [`AGENT_DETAIL`] with its tools as `{id, name}` pairs.
#[must_use]
pub fn agent_detail(agent: &JsonValue) -> JsonValue {
    let mut out = project(agent, AGENT_DETAIL);
    if let (Some(map), Some(tools)) = (out.as_object_mut(), agent.get("tools")) {
        if let Some(tools) = tools.as_array() {
            map.insert(
                "tools".to_string(),
                JsonValue::Array(project_all(tools, REFERENCE)),
            );
        }
    }
    out
}

/// Reduce passages, keeping embeddings only when asked.
#[must_use]
pub fn passages(items: &[JsonValue], include_embeddings: bool) -> Vec<JsonValue> {
    items
        .iter()
        .map(|item| {
            let mut passage = project(item, PASSAGE);
            if !include_embeddings {
                strip_fields(&mut passage, &["embedding"]);
            }
            passage
        })
        .collect()
}

/// Reduce a tool, keeping source code only when asked.
#[must_use]
pub fn tool_detail(tool: &JsonValue, include_source: bool) -> JsonValue {
    let mut out = project(tool, TOOL_DETAIL);
    if !include_source {
        strip_fields(&mut out, &["source_code"]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_agent_detail_trims_tools() {
        let agent = json!({
            "id": "agent-1",
            "agent_name": "helper",
            "system": "be nice",
            "memory": {"blocks": []},
            "tools": [{"id": "t1", "name": "search", "source_code": "def f(): pass"}]
        });
        assert_eq!(
            agent_detail(&agent),
            json!({
                "id": "agent-1",
                "name": "helper",
                "system": "be nice",
                "tools": [{"id": "t1", "name": "search"}]
            })
        );
    }

    #[test]
    fn test_passages_embedding_gate() {
        let raw = vec![json!({"id": "p1", "text": "fact", "embedding": [0.5, 0.25]})];

        let stripped = passages(&raw, false);
        assert_eq!(stripped, vec![json!({"id": "p1", "content": "fact"})]);

        let kept = passages(&raw, true);
        assert_eq!(kept[0]["embedding"], json!([0.5, 0.25]));
    }

    #[test]
    fn test_tool_detail_source_gate() {
        let tool = json!({"id": "t1", "name": "x", "source_code": "code", "args_json_schema": {}});
        assert!(tool_detail(&tool, false).get("source_code").is_none());
        assert_eq!(tool_detail(&tool, true)["source_code"], "code");
        assert!(tool_detail(&tool, true).get("args_json_schema").is_none());
    }

    #[test]
    fn test_file_aliases() {
        let file = json!({"id": "f1", "file_name": "a.txt", "file_size": 10, "file_type": "text/plain"});
        assert_eq!(
            project(&file, FILE),
            json!({"id": "f1", "filename": "a.txt", "size": 10, "mime_type": "text/plain"})
        );
    }
}
