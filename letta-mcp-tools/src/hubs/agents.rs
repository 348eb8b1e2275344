//! `letta_agent_advanced`: agent lifecycle, messaging and bulk management.

use async_trait::async_trait;
use letta_mcp_client::{ApiRequest, RemoteCall};
use letta_mcp_core::args::{required, required_value};
use letta_mcp_core::normalize::{aliases, extract_list, project, project_all, resolve_alias, str_field};
use letta_mcp_core::{CanonicalResult, HubError, HubResult, UpstreamContext};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::warn;

use crate::bulk::{AgentFilter, BatchReport};
use crate::definition::ToolDefinition;
use crate::entities::{agent_detail, AGENT_SUMMARY, MESSAGE, RUN, TOOL_SUMMARY};
use crate::hub::{compact, prepare, Hub};
use crate::operation::OperationSet;
use crate::schema::SchemaBuilder;

crate::operations! {
    /// Agent operations.
    pub enum AgentOp for "letta_agent_advanced" {
        /// List agents.
        List = "list" => [],
        /// Create an agent.
        Create = "create" => ["name"],
        /// Fetch one agent.
        Get = "get" => ["agent_id"],
        /// Change agent fields.
        Update = "update" => ["agent_id", "update_data"],
        /// Delete an agent.
        Delete = "delete" => ["agent_id"],
        /// List tools attached to an agent.
        ListTools = "list_tools" => ["agent_id"],
        /// Send messages and wait for the reply.
        SendMessage = "send_message" => ["agent_id", "messages"],
        /// Export an agent document.
        Export = "export" => ["agent_id"],
        /// Import an agent document.
        Import = "import" => ["export_data"],
        /// Export then import under a new name.
        Clone = "clone" => ["agent_id", "name"],
        /// Summarize an agent's configuration.
        GetConfig = "get_config" => ["agent_id"],
        /// Delete every agent matching a filter.
        BulkDelete = "bulk_delete" => ["filters"],
        /// Context window overview.
        Context = "context" => ["agent_id"],
        /// Clear the message buffer.
        ResetMessages = "reset_messages" => ["agent_id"],
        /// Summarize the conversation.
        Summarize = "summarize" => ["agent_id"],
        /// Send messages over the streaming endpoint and collect the events.
        Stream = "stream" => ["agent_id", "messages"],
        /// Start a background run.
        AsyncMessage = "async_message" => ["agent_id", "messages"],
        /// Cancel background runs.
        CancelMessage = "cancel_message" => ["agent_id"],
        /// Show the raw LLM payload a message would produce.
        PreviewPayload = "preview_payload" => ["agent_id", "messages"],
        /// Search messages, falling back to a local filter.
        SearchMessages = "search_messages" => ["query"],
        /// Fetch one message.
        GetMessage = "get_message" => ["agent_id", "message_id"],
        /// Count agents.
        Count = "count" => [],
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AgentRequest {
    agent_id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    system: Option<String>,
    llm_config: Option<JsonValue>,
    embedding_config: Option<JsonValue>,
    tool_ids: Option<Vec<String>>,
    tags: Option<Vec<String>>,
    limit: Option<u32>,
    offset: Option<u32>,
    update_data: Option<JsonValue>,
    messages: Option<JsonValue>,
    export_data: Option<JsonValue>,
    filters: Option<AgentFilter>,
    max_message_length: Option<u32>,
    run_ids: Option<Vec<String>>,
    query: Option<String>,
    roles: Option<Vec<String>>,
    start_date: Option<String>,
    end_date: Option<String>,
    message_id: Option<String>,
}

/// Agent management hub.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentHub;

#[async_trait]
impl Hub for AgentHub {
    fn name(&self) -> &'static str {
        AgentOp::TOOL
    }

    fn definition(&self) -> Result<ToolDefinition, serde_json::Error> {
        let filters = SchemaBuilder::new()
            .string_array("agent_ids", "Exact agent ids", false)
            .string("agent_name_filter", "Case-insensitive substring of the agent name", false)
            .string("agent_tag_filter", "Tag the agent must carry", false)
            .build()?;
        let schema = SchemaBuilder::new()
            .enum_values("operation", "Operation to perform", &AgentOp::names(), true)
            .string("agent_id", "Agent identifier", false)
            .string("name", "Agent name (create, clone; substring filter for list)", false)
            .string("description", "Agent description (create)", false)
            .string("system", "System prompt (create)", false)
            .object("llm_config", "Model configuration (create)", false)
            .object("embedding_config", "Embedding configuration (create)", false)
            .string_array("tool_ids", "Tools to attach on creation (create)", false)
            .string_array("tags", "Tags to filter by (list)", false)
            .integer("limit", "Maximum number of results", false)
            .integer("offset", "Number of results to skip (list)", false)
            .object("update_data", "Fields to change (update)", false)
            .array(
                "messages",
                "Messages to send, e.g. [{\"role\": \"user\", \"content\": \"hi\"}]",
                json!({"type": "object"}),
                false,
            )
            .object("export_data", "Exported agent document (import)", false)
            .object_with("filters", "Agent selection (bulk_delete)", filters, false)
            .integer("max_message_length", "Summary size cap (summarize)", false)
            .string_array("run_ids", "Runs to cancel (cancel_message)", false)
            .string("query", "Search text (search_messages)", false)
            .string_array("roles", "Roles to include (search_messages)", false)
            .string("start_date", "ISO 8601 lower bound (search_messages)", false)
            .string("end_date", "ISO 8601 upper bound (search_messages)", false)
            .string("message_id", "Message identifier (get_message)", false)
            .build()?;
        Ok(ToolDefinition::new(
            self.name(),
            "Manage Letta agents: lifecycle, messaging, import/export, cloning, bulk deletion and message search",
            schema,
        ))
    }

    async fn call(&self, remote: &dyn RemoteCall, args: JsonValue) -> HubResult<CanonicalResult> {
        let (op, req): (AgentOp, AgentRequest) = prepare(args)?;
        match op {
            AgentOp::List => list(remote, req).await,
            AgentOp::Create => create(remote, req).await,
            AgentOp::Get => get(remote, req).await,
            AgentOp::Update => update(remote, req).await,
            AgentOp::Delete => delete(remote, req).await,
            AgentOp::ListTools => list_tools(remote, req).await,
            AgentOp::SendMessage => send_message(remote, req).await,
            AgentOp::Export => export(remote, req).await,
            AgentOp::Import => import(remote, req).await,
            AgentOp::Clone => clone(remote, req).await,
            AgentOp::GetConfig => get_config(remote, req).await,
            AgentOp::BulkDelete => bulk_delete(remote, req).await,
            AgentOp::Context => context(remote, req).await,
            AgentOp::ResetMessages => reset_messages(remote, req).await,
            AgentOp::Summarize => summarize(remote, req).await,
            AgentOp::Stream => stream(remote, req).await,
            AgentOp::AsyncMessage => async_message(remote, req).await,
            AgentOp::CancelMessage => cancel_message(remote, req).await,
            AgentOp::PreviewPayload => preview_payload(remote, req).await,
            AgentOp::SearchMessages => search_messages(remote, req).await,
            AgentOp::GetMessage => get_message(remote, req).await,
            AgentOp::Count => count(remote).await,
        }
    }
}

async fn list(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let request = ApiRequest::get(["agents"])
        .query_opt("limit", req.limit)
        .query_opt("offset", req.offset)
        .query_opt("name", req.name.as_deref())
        .query_all("tags", req.tags.iter().flatten());
    let raw = remote.invoke(request).await.context("Listing agents")?;
    let agents = project_all(&extract_list(raw, &["agents"]), AGENT_SUMMARY);
    Ok(CanonicalResult::ok(AgentOp::List.name())
        .with_message(format!("Found {} agents", agents.len()))
        .with_items("agents", agents))
}

async fn create(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::Create.name();
    let name = required(&req.name, "name", op)?;
    let body = compact(json!({
        "name": name,
        "description": req.description,
        "system": req.system,
        "llm_config": req.llm_config,
        "embedding_config": req.embedding_config,
        "tool_ids": req.tool_ids,
    }));
    let raw = remote
        .invoke(ApiRequest::post(["agents"]).json(body))
        .await
        .context(format!("Creating agent {name}"))?;
    Ok(created_agent(op, &raw).with_message(format!("Agent {name} created")))
}

async fn get(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::Get.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    let raw = remote
        .invoke(ApiRequest::get(["agents", agent_id]))
        .await
        .context(format!("Getting agent {agent_id}"))?;
    Ok(CanonicalResult::ok(op)
        .with_message(format!("Agent {agent_id} retrieved"))
        .with("agent", agent_detail(&raw)))
}

async fn update(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::Update.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    let update_data = required_value(&req.update_data, "update_data", op)?;
    let raw = remote
        .invoke(ApiRequest::patch(["agents", agent_id]).json(update_data.clone()))
        .await
        .context(format!("Updating agent {agent_id}"))?;
    Ok(CanonicalResult::ok(op)
        .with_message(format!("Agent {agent_id} updated"))
        .with("agent", agent_detail(&raw)))
}

async fn delete(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::Delete.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    remote
        .invoke(ApiRequest::delete(["agents", agent_id]))
        .await
        .context(format!("Deleting agent {agent_id}"))?;
    Ok(CanonicalResult::ok(op)
        .with_message(format!("Agent {agent_id} deleted"))
        .with("agent_id", agent_id))
}

async fn list_tools(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::ListTools.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    let raw = remote
        .invoke(ApiRequest::get(["agents", agent_id, "tools"]))
        .await
        .context(format!("Listing tools of agent {agent_id}"))?;
    let tools = project_all(&extract_list(raw, &["tools"]), TOOL_SUMMARY);
    Ok(CanonicalResult::ok(op)
        .with_message(format!("Agent {agent_id} has {} tools", tools.len()))
        .with("agent_id", agent_id)
        .with_items("tools", tools))
}

async fn send_message(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::SendMessage.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    let messages = required_value(&req.messages, "messages", op)?;
    let raw = remote
        .invoke(ApiRequest::post(["agents", agent_id, "messages"]).json(json!({"messages": messages})))
        .await
        .context(format!("Sending message to agent {agent_id}"))?;
    let usage = raw.get("usage").cloned();
    let replies = project_all(&extract_list(raw, &["messages"]), MESSAGE);
    Ok(CanonicalResult::ok(op)
        .with_message(format!("Agent {agent_id} returned {} messages", replies.len()))
        .with_items("messages", replies)
        .with_opt("usage", usage))
}

async fn export(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::Export.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    let data = export_agent(remote, agent_id).await?;
    Ok(CanonicalResult::ok(op)
        .with_message(format!("Agent {agent_id} exported"))
        .with("agent_id", agent_id)
        .with("data", data))
}

async fn import(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::Import.name();
    let export_data = required_value(&req.export_data, "export_data", op)?;
    let raw = import_agent(remote, export_data.clone()).await?;
    Ok(created_agent(op, &raw).with_message("Agent imported"))
}

async fn clone(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::Clone.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    let name = required(&req.name, "name", op)?;

    let mut document = export_agent(remote, agent_id).await?;
    match document.as_object_mut() {
        Some(map) => {
            map.insert("name".to_string(), JsonValue::String(name.to_string()));
        }
        None => {
            return Err(HubError::invalid_args(format!(
                "export of agent {agent_id} is not an object"
            )))
        }
    }

    let raw = import_agent(remote, document).await?;
    Ok(created_agent(op, &raw)
        .with_message(format!("Agent {agent_id} cloned as {name}"))
        .with("source_agent_id", agent_id))
}

async fn get_config(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::GetConfig.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    let raw = remote
        .invoke(ApiRequest::get(["agents", agent_id]))
        .await
        .context(format!("Getting configuration of agent {agent_id}"))?;

    let tool_names: Vec<JsonValue> = raw
        .get("tools")
        .and_then(JsonValue::as_array)
        .map(|tools| {
            tools
                .iter()
                .filter_map(|tool| tool.get("name").cloned())
                .collect()
        })
        .unwrap_or_default();
    let config = json!({
        "id": raw.get("id"),
        "name": resolve_alias(&raw, &aliases::NAME),
        "system": raw.get("system"),
        "llm_config": raw.get("llm_config"),
        "embedding_config": raw.get("embedding_config"),
        "tool_names": tool_names,
    });

    Ok(CanonicalResult::ok(op)
        .with_message(format!("Configuration of agent {agent_id} retrieved"))
        .with("config", compact(config)))
}

async fn bulk_delete(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::BulkDelete.name();
    let filter = req.filters.unwrap_or_default();
    if filter.is_empty() {
        return Err(HubError::invalid_args(
            "bulk_delete needs at least one of agent_ids, agent_name_filter or agent_tag_filter",
        ));
    }

    let raw = remote
        .invoke(ApiRequest::get(["agents"]))
        .await
        .context("Listing agents for bulk delete")?;
    let agents = extract_list(raw, &["agents"]);

    let mut report = BatchReport::new();
    for agent in filter.select(&agents) {
        let Some(id) = str_field(agent, "id") else {
            continue;
        };
        let outcome = remote.invoke(ApiRequest::delete(["agents", id])).await;
        if let Err(err) = &outcome {
            warn!(agent_id = id, error = %err, "Bulk delete item failed");
        }
        report.record(id, &outcome);
    }

    let (deleted, failed) = (report.succeeded(), report.failed());
    Ok(CanonicalResult::ok(op)
        .with_success(failed == 0)
        .with_message(format!("Deleted {deleted} agents, {failed} failed"))
        .with("results", report.into_results())
        .with("deleted_count", deleted)
        .with("failed_count", failed))
}

async fn context(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::Context.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    let raw = remote
        .invoke(ApiRequest::get(["agents", agent_id, "context"]))
        .await
        .context(format!("Getting context of agent {agent_id}"))?;
    Ok(CanonicalResult::ok(op)
        .with_message(format!("Context window of agent {agent_id} retrieved"))
        .with("data", raw))
}

async fn reset_messages(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::ResetMessages.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    let raw = remote
        .invoke(ApiRequest::patch(["agents", agent_id, "reset-messages"]))
        .await
        .context(format!("Resetting messages of agent {agent_id}"))?;
    Ok(CanonicalResult::ok(op)
        .with_message(format!("Messages of agent {agent_id} reset"))
        .with("agent", agent_detail(&raw)))
}

async fn summarize(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::Summarize.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    let request = ApiRequest::post(["agents", agent_id, "summarize"])
        .query_opt("max_message_length", req.max_message_length);
    let raw = remote
        .invoke(request)
        .await
        .context(format!("Summarizing agent {agent_id}"))?;
    Ok(CanonicalResult::ok(op)
        .with_message(format!("Conversation of agent {agent_id} summarized"))
        .with("data", raw))
}

async fn stream(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::Stream.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    let messages = required_value(&req.messages, "messages", op)?;
    let body = json!({"messages": messages, "stream_tokens": false});
    let raw = remote
        .invoke(ApiRequest::post(["agents", agent_id, "messages", "stream"]).json(body))
        .await
        .context(format!("Streaming message to agent {agent_id}"))?;
    let events = project_all(&extract_list(raw, &["messages"]), MESSAGE);
    Ok(CanonicalResult::ok(op)
        .with_message(format!("Collected {} stream events", events.len()))
        .with_items("messages", events))
}

async fn async_message(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::AsyncMessage.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    let messages = required_value(&req.messages, "messages", op)?;
    let raw = remote
        .invoke(ApiRequest::post(["agents", agent_id, "messages", "async"]).json(json!({"messages": messages})))
        .await
        .context(format!("Starting run for agent {agent_id}"))?;
    Ok(CanonicalResult::ok(op)
        .with_message(format!("Run started for agent {agent_id}"))
        .with("run", project(&raw, RUN)))
}

async fn cancel_message(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::CancelMessage.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    let body = compact(json!({"run_ids": req.run_ids}));
    let raw = remote
        .invoke(ApiRequest::post(["agents", agent_id, "messages", "cancel"]).json(body))
        .await
        .context(format!("Cancelling runs of agent {agent_id}"))?;
    Ok(CanonicalResult::ok(op)
        .with_message(format!("Cancellation requested for agent {agent_id}"))
        .with("data", raw))
}

async fn preview_payload(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::PreviewPayload.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    let messages = required_value(&req.messages, "messages", op)?;
    let raw = remote
        .invoke(
            ApiRequest::post(["agents", agent_id, "messages", "preview-raw-payload"])
                .json(json!({"messages": messages})),
        )
        .await
        .context(format!("Previewing payload for agent {agent_id}"))?;
    Ok(CanonicalResult::ok(op)
        .with_message(format!("Payload preview for agent {agent_id}"))
        .with("data", raw))
}

async fn search_messages(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::SearchMessages.name();
    let query = required(&req.query, "query", op)?;
    let body = compact(json!({
        "query": query,
        "agent_id": req.agent_id,
        "roles": req.roles,
        "start_date": req.start_date,
        "end_date": req.end_date,
        "limit": req.limit,
    }));

    let err = match remote
        .invoke(ApiRequest::post(["agents", "messages", "search"]).json(body))
        .await
    {
        Ok(raw) => {
            let found = project_all(&extract_list(raw, &["messages", "results"]), MESSAGE);
            return Ok(CanonicalResult::ok(op)
                .with_message(format!("Found {} messages matching '{query}'", found.len()))
                .with_items("messages", found));
        }
        Err(err) => err,
    };

    let Some(agent_id) = req.agent_id.as_deref().filter(|id| !id.is_empty()) else {
        return Err(HubError::upstream("Searching messages", err));
    };
    warn!(agent_id, error = %err, "Message search failed, filtering recent messages locally");

    let raw = remote
        .invoke(ApiRequest::get(["agents", agent_id, "messages"]).query_opt("limit", req.limit))
        .await
        .context(format!("Listing messages of agent {agent_id}"))?;
    let needle = query.to_lowercase();
    let roles = req.roles.unwrap_or_default();
    let found: Vec<JsonValue> = project_all(&extract_list(raw, &["messages"]), MESSAGE)
        .into_iter()
        .filter(|message| roles.is_empty() || role_matches(message, &roles))
        .filter(|message| content_text(message).to_lowercase().contains(&needle))
        .collect();

    Ok(CanonicalResult::ok(op)
        .with_message(format!("Found {} messages matching '{query}'", found.len()))
        .with_items("messages", found)
        .with(
            "note",
            format!("Search endpoint failed ({err}); results are a substring match over recent messages"),
        ))
}

async fn get_message(remote: &dyn RemoteCall, req: AgentRequest) -> HubResult<CanonicalResult> {
    let op = AgentOp::GetMessage.name();
    let agent_id = required(&req.agent_id, "agent_id", op)?;
    let message_id = required(&req.message_id, "message_id", op)?;
    let raw = remote
        .invoke(ApiRequest::get(["agents", agent_id, "messages", message_id]))
        .await
        .context(format!("Getting message {message_id} of agent {agent_id}"))?;
    Ok(CanonicalResult::ok(op)
        .with_message(format!("Message {message_id} retrieved"))
        .with("message", project(&raw, MESSAGE)))
}

async fn count(remote: &dyn RemoteCall) -> HubResult<CanonicalResult> {
    let raw = remote
        .invoke(ApiRequest::get(["agents", "count"]))
        .await
        .context("Counting agents")?;
    let count = raw.get("count").cloned().unwrap_or(raw);
    Ok(CanonicalResult::ok(AgentOp::Count.name())
        .with_message(format!("Agent count: {count}"))
        .with("count", count))
}

async fn export_agent(remote: &dyn RemoteCall, agent_id: &str) -> HubResult<JsonValue> {
    remote
        .invoke(ApiRequest::get(["agents", agent_id, "export"]))
        .await
        .context(format!("Exporting agent {agent_id}"))
}

async fn import_agent(remote: &dyn RemoteCall, document: JsonValue) -> HubResult<JsonValue> {
    remote
        .invoke(ApiRequest::post(["agents", "import"]).json(document))
        .await
        .context("Importing agent")
}

fn created_agent(op: &str, raw: &JsonValue) -> CanonicalResult {
    CanonicalResult::ok(op)
        .with_opt("agent_id", raw.get("id").cloned())
        .with("agent", agent_detail(raw))
}

fn role_matches(message: &JsonValue, roles: &[String]) -> bool {
    let role = str_field(message, "role").or_else(|| str_field(message, "message_type"));
    role.map_or(false, |role| roles.iter().any(|r| r == role))
}

/// Message content as plain text; structured content is matched on its JSON form.
fn content_text(message: &JsonValue) -> String {
    match message.get("content") {
        Some(JsonValue::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use letta_mcp_client::{Method, MockRemote};
    use letta_mcp_core::ApiError;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    async fn call(remote: &MockRemote, args: JsonValue) -> HubResult<CanonicalResult> {
        AgentHub.call(remote, args).await
    }

    #[rstest]
    #[case("get")]
    #[case("update")]
    #[case("delete")]
    #[case("list_tools")]
    #[case("send_message")]
    #[case("export")]
    #[case("get_config")]
    #[case("context")]
    #[case("reset_messages")]
    #[case("summarize")]
    #[case("stream")]
    #[case("cancel_message")]
    #[case("get_message")]
    #[tokio::test]
    async fn test_agent_id_required_before_any_call(#[case] operation: &str) {
        for agent_id in [json!(null), json!("")] {
            let remote = MockRemote::new();
            let err = call(&remote, json!({"operation": operation, "agent_id": agent_id}))
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), format!("agent_id is required for {operation} operation"));
            assert_eq!(remote.call_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let remote = MockRemote::new();
        let err = call(&remote, json!({"operation": "teleport", "agent_id": "a"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown operation: teleport");
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_reports_agent_id_before_update_data() {
        let remote = MockRemote::new();
        let err = call(&remote, json!({"operation": "update"})).await.unwrap_err();
        assert_eq!(err.to_string(), "agent_id is required for update operation");
    }

    #[tokio::test]
    async fn test_list_trims_and_keeps_order() {
        let remote = MockRemote::new().with_response(json!([
            {"id": "a1", "name": "first", "memory": {"blocks": []}, "tags": ["x"]},
            {"id": "a2", "agent_name": "second", "system": "long prompt"}
        ]));
        let result = call(&remote, json!({"operation": "list", "tags": ["x", "y"]}))
            .await
            .unwrap();

        assert_eq!(
            result.get("agents"),
            Some(&json!([
                {"id": "a1", "name": "first", "tags": ["x"]},
                {"id": "a2", "name": "second"}
            ]))
        );
        assert_eq!(result.get("count"), Some(&json!(2)));
        let request = remote.last_request().unwrap();
        assert_eq!(request.query_pairs().len(), 2);
    }

    #[tokio::test]
    async fn test_list_wrapped_matches_bare() {
        let items = json!([{"id": "a1"}, {"id": "a2"}, {"id": "a3"}]);
        let bare = call(&MockRemote::new().with_response(items.clone()), json!({"operation": "list"}))
            .await
            .unwrap();
        let wrapped = call(
            &MockRemote::new().with_response(json!({"agents": items})),
            json!({"operation": "list"}),
        )
        .await
        .unwrap();
        assert_eq!(bare, wrapped);
    }

    #[tokio::test]
    async fn test_create_sends_only_present_fields() {
        let remote = MockRemote::new().with_response(json!({"id": "agent-9", "name": "helper"}));
        let result = call(&remote, json!({"operation": "create", "name": "helper", "system": "hi"}))
            .await
            .unwrap();

        assert_eq!(
            remote.last_request().unwrap().json_body(),
            Some(&json!({"name": "helper", "system": "hi"}))
        );
        assert_eq!(result.get("agent_id"), Some(&json!("agent-9")));
    }

    #[tokio::test]
    async fn test_send_message_aliases() {
        let remote = MockRemote::new().with_response(json!({
            "messages": [
                {"id": "m1", "type": "assistant_message", "text": "hello", "created_at": "2024-01-01T00:00:00Z"}
            ],
            "usage": {"total_tokens": 12}
        }));
        let result = call(
            &remote,
            json!({"operation": "send_message", "agent_id": "a1", "messages": [{"role": "user", "content": "hi"}]}),
        )
        .await
        .unwrap();

        assert_eq!(
            result.get("messages"),
            Some(&json!([{
                "id": "m1",
                "message_type": "assistant_message",
                "content": "hello",
                "timestamp": "2024-01-01T00:00:00Z"
            }]))
        );
        assert_eq!(result.get("usage"), Some(&json!({"total_tokens": 12})));
        assert_eq!(remote.last_request().unwrap().path(), "/agents/a1/messages");
    }

    #[tokio::test]
    async fn test_clone_exports_then_imports_with_new_name() {
        let remote = MockRemote::new()
            .with_response(json!({"name": "helper", "system": "s"}))
            .with_response(json!({"id": "agent-2", "name": "copy"}));
        let result = call(&remote, json!({"operation": "clone", "agent_id": "agent-1", "name": "copy"}))
            .await
            .unwrap();

        let requests = remote.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path(), "/agents/agent-1/export");
        assert_eq!(requests[1].path(), "/agents/import");
        assert_eq!(requests[1].json_body(), Some(&json!({"name": "copy", "system": "s"})));
        assert_eq!(result.get("agent_id"), Some(&json!("agent-2")));
    }

    #[tokio::test]
    async fn test_get_config() {
        let remote = MockRemote::new().with_response(json!({
            "id": "a1",
            "name": "bot",
            "system": "prompt",
            "llm_config": {"model": "gpt"},
            "tools": [{"id": "t1", "name": "search"}, {"id": "t2", "name": "send"}],
            "memory": {}
        }));
        let result = call(&remote, json!({"operation": "get_config", "agent_id": "a1"}))
            .await
            .unwrap();
        assert_eq!(
            result.get("config"),
            Some(&json!({
                "id": "a1",
                "name": "bot",
                "system": "prompt",
                "llm_config": {"model": "gpt"},
                "tool_names": ["search", "send"]
            }))
        );
    }

    #[tokio::test]
    async fn test_bulk_delete_partial_failure() {
        let remote = MockRemote::new()
            .with_response(json!([
                {"id": "a1", "name": "temp-1"},
                {"id": "a2", "name": "temp-2"},
                {"id": "keep", "name": "production"},
                {"id": "a3", "name": "TEMP-3"}
            ]))
            .with_response(JsonValue::Null)
            .with_error(ApiError::from_status(500, "database locked"))
            .with_response(JsonValue::Null);

        let result = call(
            &remote,
            json!({"operation": "bulk_delete", "filters": {"agent_name_filter": "temp"}}),
        )
        .await
        .unwrap();

        assert_eq!(result.get("deleted_count"), Some(&json!(2)));
        assert_eq!(result.get("failed_count"), Some(&json!(1)));
        let results = result.get("results").unwrap().as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[1]["id"], "a2");
        assert_eq!(results[1]["success"], false);
        assert_eq!(results[1]["error"], "HTTP 500: database locked");

        let deleted: Vec<String> = remote.requests()[1..].iter().map(|r| r.path()).collect();
        assert_eq!(deleted, vec!["/agents/a1", "/agents/a2", "/agents/a3"]);
        assert!(remote.requests()[1..].iter().all(|r| r.method() == Method::Delete));
    }

    #[tokio::test]
    async fn test_bulk_delete_empty_filter_makes_no_calls() {
        let remote = MockRemote::new();
        let err = call(&remote, json!({"operation": "bulk_delete", "filters": {}}))
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::InvalidArguments(_)));
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_collects_events() {
        let remote = MockRemote::new().with_response(json!([
            {"id": "m1", "message_type": "reasoning_message", "reasoning": "thinking"},
            {"id": "m2", "message_type": "assistant_message", "content": "done"}
        ]));
        let result = call(
            &remote,
            json!({"operation": "stream", "agent_id": "a1", "messages": [{"role": "user", "content": "go"}]}),
        )
        .await
        .unwrap();

        assert_eq!(result.get("count"), Some(&json!(2)));
        let request = remote.last_request().unwrap();
        assert_eq!(request.path(), "/agents/a1/messages/stream");
        assert_eq!(request.json_body().unwrap()["stream_tokens"], false);
    }

    #[tokio::test]
    async fn test_search_falls_back_with_note() {
        let remote = MockRemote::new()
            .with_error(ApiError::from_status(404, "search unavailable"))
            .with_response(json!([
                {"id": "m1", "role": "user", "content": "Where is the Paris office?"},
                {"id": "m2", "role": "assistant", "content": "The paris office is downtown."},
                {"id": "m3", "role": "user", "content": "thanks"}
            ]));

        let result = call(
            &remote,
            json!({"operation": "search_messages", "query": "PARIS", "agent_id": "a1", "roles": ["assistant"]}),
        )
        .await
        .unwrap();

        assert_eq!(result.get("count"), Some(&json!(1)));
        assert_eq!(result.get("messages").unwrap()[0]["id"], "m2");
        assert!(result.get("note").is_some());
        assert_eq!(remote.requests()[1].path(), "/agents/a1/messages");
    }

    #[tokio::test]
    async fn test_search_without_agent_propagates() {
        let remote = MockRemote::new().with_error(ApiError::from_status(500, "down"));
        let err = call(&remote, json!({"operation": "search_messages", "query": "x"}))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Searching messages: "));
        assert_eq!(remote.call_count(), 1);
    }

    #[tokio::test]
    async fn test_search_primary_path() {
        let remote = MockRemote::new().with_response(json!({"results": [{"id": "m1", "text": "hit"}]}));
        let result = call(&remote, json!({"operation": "search_messages", "query": "hit"}))
            .await
            .unwrap();
        assert!(result.get("note").is_none());
        assert_eq!(result.get("messages"), Some(&json!([{"id": "m1", "content": "hit"}])));
        assert_eq!(
            remote.last_request().unwrap().json_body(),
            Some(&json!({"query": "hit"}))
        );
    }

    #[tokio::test]
    async fn test_count_is_idempotent() {
        let remote = MockRemote::new().with_response(json!(7)).with_response(json!(7));
        let first = call(&remote, json!({"operation": "count"})).await.unwrap();
        let second = call(&remote, json!({"operation": "count"})).await.unwrap();
        assert_eq!(first.to_json_string().unwrap(), second.to_json_string().unwrap());
        assert_eq!(first.get("count"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn test_encodes_identifiers() {
        let remote = MockRemote::new().with_response(json!({"id": "team/a#1"}));
        call(&remote, json!({"operation": "get", "agent_id": "team/a#1"}))
            .await
            .unwrap();
        assert_eq!(remote.last_request().unwrap().path(), "/agents/team%2Fa%231");
    }
}
