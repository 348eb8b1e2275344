//! `letta_memory_unified`: core memory blocks, archival passages and message history.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use letta_mcp_client::{ApiRequest, RemoteCall};
use letta_mcp_core::args::required;
use letta_mcp_core::normalize::{extract_list, project, project_all};
use letta_mcp_core::{CanonicalResult, HubResult, UpstreamContext};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::definition::ToolDefinition;
use crate::entities::{passages, AGENT_SUMMARY, BLOCK, MESSAGE};
use crate::hub::{compact, prepare, Hub};
use crate::operation::OperationSet;
use crate::schema::SchemaBuilder;

crate::operations! {
    /// Memory operations.
    pub enum MemoryOp for "letta_memory_unified" {
        /// All core memory blocks of an agent.
        GetCoreMemory = "get_core_memory" => ["agent_id"],
        /// Replace the value of a core memory block.
        UpdateCoreMemory = "update_core_memory" => ["agent_id", "block_label", "value"],
        /// One core memory block by label.
        GetBlockByLabel = "get_block_by_label" => ["agent_id", "block_label"],
        /// Blocks attached to an agent.
        ListBlocks = "list_blocks" => ["agent_id"],
        /// Create a standalone block.
        CreateBlock = "create_block" => ["label", "value"],
        /// Fetch a block by id.
        GetBlock = "get_block" => ["block_id"],
        /// Change a block by id.
        UpdateBlock = "update_block" => ["block_id"],
        /// Attach a block to an agent.
        AttachBlock = "attach_block" => ["agent_id", "block_id"],
        /// Detach a block from an agent.
        DetachBlock = "detach_block" => ["agent_id", "block_id"],
        /// Agents sharing a block.
        ListAgentsUsingBlock = "list_agents_using_block" => ["block_id"],
        /// Semantic search over archival memory.
        SearchArchival = "search_archival" | "search_archival_memory" => ["agent_id", "query"],
        /// List archival passages.
        ListPassages = "list_passages" => ["agent_id"],
        /// Insert an archival passage.
        CreatePassage = "create_passage" => ["agent_id", "text"],
        /// Rewrite an archival passage.
        UpdatePassage = "update_passage" => ["agent_id", "passage_id", "text"],
        /// Remove an archival passage.
        DeletePassage = "delete_passage" => ["agent_id", "passage_id"],
        /// Recent conversation messages.
        ListMessages = "list_messages" => ["agent_id"],
        /// Record a conversation line in archival memory.
        CreateConversationEntry = "create_conversation_entry" => ["agent_id", "role", "content"],
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MemoryRequest {
    agent_id: Option<String>,
    block_label: Option<String>,
    block_id: Option<String>,
    label: Option<String>,
    value: Option<String>,
    description: Option<String>,
    limit: Option<u32>,
    is_template: Option<bool>,
    query: Option<String>,
    include_embeddings: Option<bool>,
    after: Option<String>,
    before: Option<String>,
    search: Option<String>,
    passage_id: Option<String>,
    text: Option<String>,
    role: Option<String>,
    content: Option<String>,
    timestamp: Option<String>,
}

/// Memory hub.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryHub;

#[async_trait]
impl Hub for MemoryHub {
    fn name(&self) -> &'static str {
        MemoryOp::TOOL
    }

    fn definition(&self) -> Result<ToolDefinition, serde_json::Error> {
        let schema = SchemaBuilder::new()
            .enum_values("operation", "Operation to perform", &MemoryOp::names(), true)
            .string("agent_id", "Agent identifier", false)
            .string("block_label", "Core memory block label, e.g. human or persona", false)
            .string("block_id", "Block identifier", false)
            .string("label", "Label of a new block (create_block, update_block)", false)
            .string("value", "Block content", false)
            .string("description", "Block description", false)
            .integer("limit", "Maximum number of results, or block character limit", false)
            .boolean("is_template", "Create the block as a template (create_block)", false)
            .string("query", "Search text (search_archival)", false)
            .boolean(
                "include_embeddings",
                "Return embedding vectors with passages (default false)",
                false,
            )
            .string("after", "Cursor: return items after this id", false)
            .string("before", "Cursor: return items before this id", false)
            .string("search", "Text filter (list_passages)", false)
            .string("passage_id", "Passage identifier", false)
            .string("text", "Passage text", false)
            .string("role", "Speaker role (create_conversation_entry)", false)
            .string("content", "Spoken content (create_conversation_entry)", false)
            .string(
                "timestamp",
                "RFC 3339 timestamp (create_conversation_entry, defaults to now)",
                false,
            )
            .build()?;
        Ok(ToolDefinition::new(
            self.name(),
            "Manage agent memory: core memory blocks, shared blocks, archival passages and conversation history",
            schema,
        ))
    }

    async fn call(&self, remote: &dyn RemoteCall, args: JsonValue) -> HubResult<CanonicalResult> {
        let (op, req): (MemoryOp, MemoryRequest) = prepare(args)?;
        let name = op.name();
        match op {
            MemoryOp::GetCoreMemory => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let raw = remote
                    .invoke(ApiRequest::get(["agents", agent_id, "memory"]))
                    .await
                    .context(format!("Getting core memory of agent {agent_id}"))?;
                let blocks = project_all(&extract_list(raw, &["blocks", "memory"]), BLOCK);
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Agent {agent_id} has {} core memory blocks", blocks.len()))
                    .with("agent_id", agent_id)
                    .with("core_memory", blocks))
            }
            MemoryOp::UpdateCoreMemory => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let label = required(&req.block_label, "block_label", name)?;
                let value = required(&req.value, "value", name)?;
                let raw = remote
                    .invoke(
                        ApiRequest::patch(["agents", agent_id, "memory", "blocks", label])
                            .json(json!({"value": value})),
                    )
                    .await
                    .context(format!("Updating block {label} of agent {agent_id}"))?;
                Ok(block_result(name, &raw).with_message(format!("Block {label} updated")))
            }
            MemoryOp::GetBlockByLabel => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let label = required(&req.block_label, "block_label", name)?;
                let raw = remote
                    .invoke(ApiRequest::get(["agents", agent_id, "memory", "blocks", label]))
                    .await
                    .context(format!("Getting block {label} of agent {agent_id}"))?;
                Ok(block_result(name, &raw).with_message(format!("Block {label} retrieved")))
            }
            MemoryOp::ListBlocks => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let raw = remote
                    .invoke(ApiRequest::get(["agents", agent_id, "memory", "blocks"]))
                    .await
                    .context(format!("Listing blocks of agent {agent_id}"))?;
                let blocks = project_all(&extract_list(raw, &["blocks"]), BLOCK);
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Found {} blocks", blocks.len()))
                    .with_items("blocks", blocks))
            }
            MemoryOp::CreateBlock => {
                let label = required(&req.label, "label", name)?;
                let value = required(&req.value, "value", name)?;
                let body = compact(json!({
                    "label": label,
                    "value": value,
                    "description": req.description,
                    "limit": req.limit,
                    "is_template": req.is_template,
                }));
                let raw = remote
                    .invoke(ApiRequest::post(["blocks"]).json(body))
                    .await
                    .context(format!("Creating block {label}"))?;
                Ok(block_result(name, &raw)
                    .with_message(format!("Block {label} created"))
                    .with_opt("block_id", raw.get("id").cloned()))
            }
            MemoryOp::GetBlock => {
                let block_id = required(&req.block_id, "block_id", name)?;
                let raw = remote
                    .invoke(ApiRequest::get(["blocks", block_id]))
                    .await
                    .context(format!("Getting block {block_id}"))?;
                Ok(block_result(name, &raw).with_message(format!("Block {block_id} retrieved")))
            }
            MemoryOp::UpdateBlock => {
                let block_id = required(&req.block_id, "block_id", name)?;
                let body = compact(json!({
                    "label": req.label,
                    "value": req.value,
                    "description": req.description,
                    "limit": req.limit,
                }));
                let raw = remote
                    .invoke(ApiRequest::patch(["blocks", block_id]).json(body))
                    .await
                    .context(format!("Updating block {block_id}"))?;
                Ok(block_result(name, &raw).with_message(format!("Block {block_id} updated")))
            }
            MemoryOp::AttachBlock | MemoryOp::DetachBlock => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let block_id = required(&req.block_id, "block_id", name)?;
                let (verb, past) = match op {
                    MemoryOp::AttachBlock => ("attach", "attached to"),
                    _ => ("detach", "detached from"),
                };
                remote
                    .invoke(ApiRequest::patch([
                        "agents", agent_id, "memory", "blocks", verb, block_id,
                    ]))
                    .await
                    .context(format!("Updating blocks of agent {agent_id}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Block {block_id} {past} agent {agent_id}"))
                    .with("agent_id", agent_id)
                    .with("block_id", block_id))
            }
            MemoryOp::ListAgentsUsingBlock => {
                let block_id = required(&req.block_id, "block_id", name)?;
                let raw = remote
                    .invoke(ApiRequest::get(["blocks", block_id, "agents"]))
                    .await
                    .context(format!("Listing agents using block {block_id}"))?;
                let agents = project_all(&extract_list(raw, &["agents"]), AGENT_SUMMARY);
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("{} agents use block {block_id}", agents.len()))
                    .with_items("agents", agents))
            }
            MemoryOp::SearchArchival => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let query = required(&req.query, "query", name)?;
                let request = ApiRequest::get(["agents", agent_id, "archival-memory", "search"])
                    .query("query", query)
                    .query_opt("limit", req.limit);
                let raw = remote
                    .invoke(request)
                    .await
                    .context(format!("Searching archival memory of agent {agent_id}"))?;
                let found = passages(&extract_list(raw, &["results", "passages"]), req.include_embeddings.unwrap_or(false));
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Found {} passages", found.len()))
                    .with_items("passages", found))
            }
            MemoryOp::ListPassages => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let request = ApiRequest::get(["agents", agent_id, "archival-memory"])
                    .query_opt("limit", req.limit)
                    .query_opt("after", req.after.as_deref())
                    .query_opt("before", req.before.as_deref())
                    .query_opt("search", req.search.as_deref());
                let raw = remote
                    .invoke(request)
                    .await
                    .context(format!("Listing passages of agent {agent_id}"))?;
                let found = passages(&extract_list(raw, &["passages"]), req.include_embeddings.unwrap_or(false));
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Found {} passages", found.len()))
                    .with_items("passages", found))
            }
            MemoryOp::CreatePassage => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let text = required(&req.text, "text", name)?;
                let raw = insert_passage(remote, agent_id, text).await?;
                let created = passages(&passage_list(raw), req.include_embeddings.unwrap_or(false));
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Created {} passages", created.len()))
                    .with("passages", created))
            }
            MemoryOp::UpdatePassage => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let passage_id = required(&req.passage_id, "passage_id", name)?;
                let text = required(&req.text, "text", name)?;
                let raw = remote
                    .invoke(
                        ApiRequest::patch(["agents", agent_id, "archival-memory", passage_id])
                            .json(json!({"text": text})),
                    )
                    .await
                    .context(format!("Updating passage {passage_id}"))?;
                let updated = passages(&passage_list(raw), req.include_embeddings.unwrap_or(false));
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Passage {passage_id} updated"))
                    .with("passages", updated))
            }
            MemoryOp::DeletePassage => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let passage_id = required(&req.passage_id, "passage_id", name)?;
                remote
                    .invoke(ApiRequest::delete(["agents", agent_id, "archival-memory", passage_id]))
                    .await
                    .context(format!("Deleting passage {passage_id}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Passage {passage_id} deleted"))
                    .with("passage_id", passage_id))
            }
            MemoryOp::ListMessages => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let request = ApiRequest::get(["agents", agent_id, "messages"])
                    .query_opt("limit", req.limit)
                    .query_opt("before", req.before.as_deref())
                    .query_opt("after", req.after.as_deref());
                let raw = remote
                    .invoke(request)
                    .await
                    .context(format!("Listing messages of agent {agent_id}"))?;
                let messages = project_all(&extract_list(raw, &["messages"]), MESSAGE);
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Found {} messages", messages.len()))
                    .with_items("messages", messages))
            }
            MemoryOp::CreateConversationEntry => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let role = required(&req.role, "role", name)?;
                let content = required(&req.content, "content", name)?;
                let timestamp = req
                    .timestamp
                    .clone()
                    .filter(|ts| !ts.is_empty())
                    .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

                let raw = insert_passage(remote, agent_id, &format!("[{timestamp}] {role}: {content}"))
                    .await?;
                let passage_id = passage_list(raw)
                    .first()
                    .and_then(|p| p.get("id").cloned());
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Conversation entry stored for agent {agent_id}"))
                    .with_opt("passage_id", passage_id)
                    .with("timestamp", timestamp))
            }
        }
    }
}

async fn insert_passage(remote: &dyn RemoteCall, agent_id: &str, text: &str) -> HubResult<JsonValue> {
    let raw = remote
        .invoke(ApiRequest::post(["agents", agent_id, "archival-memory"]).json(json!({"text": text})))
        .await
        .context(format!("Creating passage for agent {agent_id}"))?;
    Ok(raw)
}

/// Passage writes answer with a list, a `{passages: []}` wrapper or the lone
/// passage object; a single object becomes a one-item list.
fn passage_list(raw: JsonValue) -> Vec<JsonValue> {
    if raw.get("id").is_some() {
        vec![raw]
    } else {
        extract_list(raw, &["passages"])
    }
}

fn block_result(op: &str, raw: &JsonValue) -> CanonicalResult {
    CanonicalResult::ok(op).with("block", project(raw, BLOCK))
}

#[cfg(test)]
mod tests {
    use super::*;
    use letta_mcp_client::{Method, MockRemote};
    use letta_mcp_core::HubError;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    async fn call(remote: &MockRemote, args: JsonValue) -> HubResult<CanonicalResult> {
        MemoryHub.call(remote, args).await
    }

    #[rstest]
    #[case(json!({"operation": "get_core_memory"}))]
    #[case(json!({"operation": "list_blocks", "agent_id": ""}))]
    #[case(json!({"operation": "list_messages", "agent_id": null}))]
    #[case(json!({"operation": "search_archival", "query": "q"}))]
    #[case(json!({"operation": "create_conversation_entry", "role": "user", "content": "hi"}))]
    #[tokio::test]
    async fn test_missing_agent_id(#[case] args: JsonValue) {
        let remote = MockRemote::new();
        let err = call(&remote, args).await.unwrap_err();
        assert!(matches!(err, HubError::MissingArgument { ref field, .. } if field == "agent_id"));
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let remote = MockRemote::new();
        let err = call(
            &remote,
            json!({"operation": "create_conversation_entry", "agent_id": "a1", "role": "user", "content": ""}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "content is required for create_conversation_entry operation");
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_list_messages_end_to_end() {
        let remote = MockRemote::new().with_response(json!([
            {"id": "m1", "message_type": "user_message", "content": "hi", "date": "2024-01-01T00:00:00Z"},
            {"id": "m2", "type": "assistant_message", "text": "hello", "created_at": "2024-01-01T00:00:01Z"}
        ]));
        let result = call(&remote, json!({"operation": "list_messages", "agent_id": "agent-123"}))
            .await
            .unwrap();

        assert_eq!(result.get("count"), Some(&json!(2)));
        assert_eq!(
            result.get("messages"),
            Some(&json!([
                {"id": "m1", "message_type": "user_message", "content": "hi", "timestamp": "2024-01-01T00:00:00Z"},
                {"id": "m2", "message_type": "assistant_message", "content": "hello", "timestamp": "2024-01-01T00:00:01Z"}
            ]))
        );

        let request = remote.last_request().unwrap();
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.path(), "/agents/agent-123/messages");
        assert!(request.query_pairs().is_empty());
    }

    #[tokio::test]
    async fn test_search_archival_embedding_gate() {
        let upstream = json!([
            {"id": "p1", "text": "likes tea", "embedding": [0.1, 0.2], "agent_id": "a1"},
            {"id": "p2", "text": "lives in Oslo", "embedding": [0.3, 0.4], "agent_id": "a1"}
        ]);

        let remote = MockRemote::new().with_response(upstream.clone());
        let stripped = call(
            &remote,
            json!({"operation": "search_archival_memory", "agent_id": "a1", "query": "q", "include_embeddings": false}),
        )
        .await
        .unwrap();
        for passage in stripped.get("passages").unwrap().as_array().unwrap() {
            assert!(passage.get("embedding").is_none());
        }
        assert_eq!(
            remote.last_request().unwrap().path(),
            "/agents/a1/archival-memory/search"
        );

        let remote = MockRemote::new().with_response(upstream);
        let kept = call(
            &remote,
            json!({"operation": "search_archival", "agent_id": "a1", "query": "q", "include_embeddings": true}),
        )
        .await
        .unwrap();
        let kept = kept.get("passages").unwrap();
        assert_eq!(kept[0]["embedding"], json!([0.1, 0.2]));
        assert_eq!(kept[1]["embedding"], json!([0.3, 0.4]));
    }

    #[tokio::test]
    async fn test_search_archival_wrapped_results() {
        let remote = MockRemote::new().with_response(json!({"results": [{"id": "p1", "content": "x"}]}));
        let result = call(&remote, json!({"operation": "search_archival", "agent_id": "a1", "query": "x"}))
            .await
            .unwrap();
        assert_eq!(result.get("count"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_update_core_memory() {
        let remote = MockRemote::new().with_response(json!({
            "id": "block-1", "label": "human", "value": "Name: Ada", "limit": 5000, "metadata": {}
        }));
        let result = call(
            &remote,
            json!({"operation": "update_core_memory", "agent_id": "a1", "block_label": "human", "value": "Name: Ada"}),
        )
        .await
        .unwrap();

        let request = remote.last_request().unwrap();
        assert_eq!(request.method(), Method::Patch);
        assert_eq!(request.path(), "/agents/a1/memory/blocks/human");
        assert_eq!(request.json_body(), Some(&json!({"value": "Name: Ada"})));
        assert_eq!(
            result.get("block"),
            Some(&json!({"id": "block-1", "label": "human", "value": "Name: Ada", "limit": 5000}))
        );
    }

    #[tokio::test]
    async fn test_attach_block_path() {
        let remote = MockRemote::new();
        call(&remote, json!({"operation": "attach_block", "agent_id": "a1", "block_id": "b 1"}))
            .await
            .unwrap();
        assert_eq!(
            remote.last_request().unwrap().path(),
            "/agents/a1/memory/blocks/attach/b%201"
        );
    }

    #[tokio::test]
    async fn test_core_memory_wrapped_blocks() {
        let remote = MockRemote::new().with_response(json!({
            "blocks": [{"id": "b1", "label": "persona", "value": "helpful"}],
            "prompt_template": "..."
        }));
        let result = call(&remote, json!({"operation": "get_core_memory", "agent_id": "a1"}))
            .await
            .unwrap();
        assert_eq!(
            result.get("core_memory"),
            Some(&json!([{"id": "b1", "label": "persona", "value": "helpful"}]))
        );
    }

    #[tokio::test]
    async fn test_conversation_entry_with_explicit_timestamp() {
        let remote = MockRemote::new().with_response(json!([{"id": "passage-1", "text": "..."}]));
        let result = call(
            &remote,
            json!({
                "operation": "create_conversation_entry",
                "agent_id": "a1",
                "role": "user",
                "content": "I moved to Oslo",
                "timestamp": "2024-05-01T10:00:00Z"
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            remote.last_request().unwrap().json_body(),
            Some(&json!({"text": "[2024-05-01T10:00:00Z] user: I moved to Oslo"}))
        );
        assert_eq!(result.get("passage_id"), Some(&json!("passage-1")));
        assert_eq!(result.get("timestamp"), Some(&json!("2024-05-01T10:00:00Z")));
    }

    #[tokio::test]
    async fn test_conversation_entry_default_timestamp() {
        let remote = MockRemote::new().with_response(json!({"id": "passage-2"}));
        let result = call(
            &remote,
            json!({"operation": "create_conversation_entry", "agent_id": "a1", "role": "assistant", "content": "ok"}),
        )
        .await
        .unwrap();

        let timestamp = result.get("timestamp").and_then(JsonValue::as_str).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert_eq!(result.get("passage_id"), Some(&json!("passage-2")));
    }

    #[tokio::test]
    async fn test_list_passages_is_idempotent() {
        let page = json!([{"id": "p1", "text": "a", "created_at": "2024-01-01T00:00:00Z"}]);
        let remote = MockRemote::new().with_response(page.clone()).with_response(page);
        let args = json!({"operation": "list_passages", "agent_id": "a1", "limit": 10});
        let first = call(&remote, args.clone()).await.unwrap();
        let second = call(&remote, args).await.unwrap();
        assert_eq!(first.to_json_string().unwrap(), second.to_json_string().unwrap());
    }

    #[rstest]
    #[case::single_object(json!({"id": "p1", "text": "new text", "embedding": [0.1]}))]
    #[case::array(json!([{"id": "p1", "text": "new text", "embedding": [0.1]}]))]
    #[case::wrapped(json!({"passages": [{"id": "p1", "text": "new text", "embedding": [0.1]}]}))]
    #[tokio::test]
    async fn test_update_passage_response_shapes(#[case] response: JsonValue) {
        let remote = MockRemote::new().with_response(response);
        let result = call(
            &remote,
            json!({"operation": "update_passage", "agent_id": "a1", "passage_id": "p1", "text": "new text"}),
        )
        .await
        .unwrap();

        let request = remote.last_request().unwrap();
        assert_eq!(request.method(), Method::Patch);
        assert_eq!(request.path(), "/agents/a1/archival-memory/p1");
        assert_eq!(request.json_body(), Some(&json!({"text": "new text"})));
        assert_eq!(
            result.get("passages"),
            Some(&json!([{"id": "p1", "content": "new text"}]))
        );
    }

    #[tokio::test]
    async fn test_create_passage_single_object() {
        let remote = MockRemote::new().with_response(json!({"id": "p9", "text": "remember this"}));
        let result = call(
            &remote,
            json!({"operation": "create_passage", "agent_id": "a1", "text": "remember this"}),
        )
        .await
        .unwrap();
        assert_eq!(
            result.get("passages"),
            Some(&json!([{"id": "p9", "content": "remember this"}]))
        );
    }
}
