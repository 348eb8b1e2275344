//! `letta_tool_manager`: tool CRUD, agent attachment and code generation.

use async_trait::async_trait;
use letta_mcp_client::{ApiRequest, RemoteCall};
use letta_mcp_core::args::required;
use letta_mcp_core::normalize::{extract_list, project_all, str_field};
use letta_mcp_core::{CanonicalResult, HubError, HubResult, UpstreamContext};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::bulk::{AgentFilter, BatchReport};
use crate::definition::ToolDefinition;
use crate::entities::{tool_detail, TOOL_SUMMARY};
use crate::hub::{compact, prepare, Hub};
use crate::operation::OperationSet;
use crate::schema::SchemaBuilder;

crate::operations! {
    /// Tool manager operations.
    pub enum ToolOp for "letta_tool_manager" {
        /// List tools.
        List = "list" => [],
        /// Fetch one tool.
        Get = "get" => ["tool_id"],
        /// Create a tool from source.
        Create = "create" => ["source_code"],
        /// Attach a tool to an agent.
        Attach = "attach" => ["agent_id", "tool_id"],
        /// Attach a tool to every agent matching a filter.
        BulkAttach = "bulk_attach" => ["tool_id", "filters"],
        /// Change a tool.
        Update = "update" => ["tool_id"],
        /// Delete a tool.
        Delete = "delete" => ["tool_id"],
        /// Update the tool with this name, or create it.
        Upsert = "upsert" => ["name", "source_code"],
        /// Detach a tool from an agent.
        Detach = "detach" => ["agent_id", "tool_id"],
        /// Generate a tool from a natural language prompt.
        GenerateFromPrompt = "generate_from_prompt" => ["prompt", "name"],
        /// Derive a JSON schema from source.
        GenerateSchema = "generate_schema" => ["source_code"],
        /// Execute source without registering it.
        RunFromSource = "run_from_source" => ["source_code"],
        /// Install the platform's built-in tools.
        AddBaseTools = "add_base_tools" => [],
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ToolRequest {
    tool_id: Option<String>,
    agent_id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    source_code: Option<String>,
    source_type: Option<String>,
    tags: Option<Vec<String>>,
    json_schema: Option<JsonValue>,
    args_json_schema: Option<JsonValue>,
    return_char_limit: Option<u32>,
    include_source: Option<bool>,
    limit: Option<u32>,
    filters: Option<AgentFilter>,
    prompt: Option<String>,
    args: Option<JsonValue>,
    env_vars: Option<JsonValue>,
}

impl ToolRequest {
    /// Tool fields shared by create, update and upsert.
    fn tool_body(&self) -> JsonValue {
        compact(json!({
            "source_code": self.source_code,
            "source_type": self.source_type,
            "description": self.description,
            "tags": self.tags,
            "json_schema": self.json_schema,
            "args_json_schema": self.args_json_schema,
            "return_char_limit": self.return_char_limit,
        }))
    }

    fn include_source(&self) -> bool {
        self.include_source.unwrap_or(false)
    }
}

/// Tool management hub.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolManagerHub;

#[async_trait]
impl Hub for ToolManagerHub {
    fn name(&self) -> &'static str {
        ToolOp::TOOL
    }

    fn definition(&self) -> Result<ToolDefinition, serde_json::Error> {
        let filters = SchemaBuilder::new()
            .string_array("agent_ids", "Exact agent ids", false)
            .string("agent_name_filter", "Case-insensitive substring of the agent name", false)
            .string("agent_tag_filter", "Tag the agent must carry", false)
            .build()?;
        let schema = SchemaBuilder::new()
            .enum_values("operation", "Operation to perform", &ToolOp::names(), true)
            .string("tool_id", "Tool identifier", false)
            .string("agent_id", "Agent identifier (attach, detach)", false)
            .string("name", "Tool name (upsert, generate_from_prompt; filter for list)", false)
            .string("description", "Tool description", false)
            .string("source_code", "Tool source code", false)
            .string("source_type", "Source language, e.g. python", false)
            .string_array("tags", "Tool tags", false)
            .object("json_schema", "Explicit tool JSON schema", false)
            .object("args_json_schema", "Schema of the tool arguments", false)
            .integer("return_char_limit", "Maximum characters returned by the tool", false)
            .boolean("include_source", "Return source code (get, default false)", false)
            .integer("limit", "Maximum number of results (list)", false)
            .object_with("filters", "Agent selection (bulk_attach)", filters, false)
            .string("prompt", "What the generated tool should do (generate_from_prompt)", false)
            .object("args", "Arguments for run_from_source", false)
            .object("env_vars", "Environment variables for run_from_source", false)
            .build()?;
        Ok(ToolDefinition::new(
            self.name(),
            "Manage Letta tools: CRUD, upsert, attaching to agents, generation from prompts and sandboxed runs",
            schema,
        ))
    }

    async fn call(&self, remote: &dyn RemoteCall, args: JsonValue) -> HubResult<CanonicalResult> {
        let (op, req): (ToolOp, ToolRequest) = prepare(args)?;
        let name = op.name();
        match op {
            ToolOp::List => {
                let request = ApiRequest::get(["tools"])
                    .query_opt("limit", req.limit)
                    .query_opt("name", req.name.as_deref());
                let raw = remote.invoke(request).await.context("Listing tools")?;
                let tools = project_all(&extract_list(raw, &["tools"]), TOOL_SUMMARY);
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Found {} tools", tools.len()))
                    .with_items("tools", tools))
            }
            ToolOp::Get => {
                let tool_id = required(&req.tool_id, "tool_id", name)?;
                let raw = remote
                    .invoke(ApiRequest::get(["tools", tool_id]))
                    .await
                    .context(format!("Getting tool {tool_id}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Tool {tool_id} retrieved"))
                    .with("tool", tool_detail(&raw, req.include_source())))
            }
            ToolOp::Create => {
                let raw = remote
                    .invoke(ApiRequest::post(["tools"]).json(req.tool_body()))
                    .await
                    .context("Creating tool")?;
                Ok(tool_written(name, &raw, req.include_source()).with_message("Tool created"))
            }
            ToolOp::Update => {
                let tool_id = required(&req.tool_id, "tool_id", name)?;
                let raw = remote
                    .invoke(ApiRequest::patch(["tools", tool_id]).json(req.tool_body()))
                    .await
                    .context(format!("Updating tool {tool_id}"))?;
                Ok(tool_written(name, &raw, req.include_source())
                    .with_message(format!("Tool {tool_id} updated")))
            }
            ToolOp::Delete => {
                let tool_id = required(&req.tool_id, "tool_id", name)?;
                remote
                    .invoke(ApiRequest::delete(["tools", tool_id]))
                    .await
                    .context(format!("Deleting tool {tool_id}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Tool {tool_id} deleted"))
                    .with("tool_id", tool_id))
            }
            ToolOp::Attach | ToolOp::Detach => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let tool_id = required(&req.tool_id, "tool_id", name)?;
                let (verb, past) = match op {
                    ToolOp::Attach => ("attach", "attached to"),
                    _ => ("detach", "detached from"),
                };
                remote
                    .invoke(attachment(agent_id, verb, tool_id))
                    .await
                    .context(format!("Updating tools of agent {agent_id}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Tool {tool_id} {past} agent {agent_id}"))
                    .with("agent_id", agent_id)
                    .with("tool_id", tool_id))
            }
            ToolOp::BulkAttach => bulk_attach(remote, req).await,
            ToolOp::Upsert => upsert(remote, req).await,
            ToolOp::GenerateFromPrompt => {
                let prompt = required(&req.prompt, "prompt", name)?;
                let tool_name = required(&req.name, "name", name)?;
                let raw = remote
                    .invoke(
                        ApiRequest::post(["tools", "generate-tool"])
                            .json(json!({"prompt": prompt, "tool_name": tool_name})),
                    )
                    .await
                    .context(format!("Generating tool {tool_name}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Tool {tool_name} generated"))
                    .with("data", raw))
            }
            ToolOp::GenerateSchema => {
                let source_code = required(&req.source_code, "source_code", name)?;
                let body = compact(json!({"code": source_code, "tool_name": req.name}));
                let raw = remote
                    .invoke(ApiRequest::post(["tools", "generate-schema"]).json(body))
                    .await
                    .context("Generating tool schema")?;
                Ok(CanonicalResult::ok(name)
                    .with_message("Schema generated")
                    .with("json_schema", raw))
            }
            ToolOp::RunFromSource => {
                let source_code = required(&req.source_code, "source_code", name)?;
                let body = compact(json!({
                    "source_code": source_code,
                    "args": req.args.clone().unwrap_or_else(|| json!({})),
                    "env_vars": req.env_vars,
                    "name": req.name,
                    "source_type": req.source_type,
                }));
                let raw = remote
                    .invoke(ApiRequest::post(["tools", "run"]).json(body))
                    .await
                    .context("Running tool from source")?;
                Ok(CanonicalResult::ok(name)
                    .with_message("Tool executed")
                    .with("data", raw))
            }
            ToolOp::AddBaseTools => {
                let raw = remote
                    .invoke(ApiRequest::post(["tools", "add-base-tools"]))
                    .await
                    .context("Adding base tools")?;
                let tools = project_all(&extract_list(raw, &["tools"]), TOOL_SUMMARY);
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Added {} base tools", tools.len()))
                    .with_items("tools", tools))
            }
        }
    }
}

fn attachment(agent_id: &str, verb: &str, tool_id: &str) -> ApiRequest {
    ApiRequest::patch(["agents", agent_id, "tools", verb, tool_id])
}

fn tool_written(op: &str, raw: &JsonValue, include_source: bool) -> CanonicalResult {
    CanonicalResult::ok(op)
        .with_opt("tool_id", raw.get("id").cloned())
        .with("tool", tool_detail(raw, include_source))
}

async fn bulk_attach(remote: &dyn RemoteCall, req: ToolRequest) -> HubResult<CanonicalResult> {
    let op = ToolOp::BulkAttach.name();
    let tool_id = required(&req.tool_id, "tool_id", op)?;
    let filter = req.filters.unwrap_or_default();
    if filter.is_empty() {
        return Err(HubError::invalid_args(
            "bulk_attach needs at least one of agent_ids, agent_name_filter or agent_tag_filter",
        ));
    }

    let raw = remote
        .invoke(ApiRequest::get(["agents"]))
        .await
        .context("Listing agents for bulk attach")?;
    let agents = extract_list(raw, &["agents"]);

    let mut report = BatchReport::new();
    for agent in filter.select(&agents) {
        let Some(agent_id) = str_field(agent, "id") else {
            continue;
        };
        let outcome = remote.invoke(attachment(agent_id, "attach", tool_id)).await;
        if let Err(err) = &outcome {
            warn!(agent_id, tool_id, error = %err, "Bulk attach item failed");
        }
        report.record(agent_id, &outcome);
    }

    let (attached, failed) = (report.succeeded(), report.failed());
    Ok(CanonicalResult::ok(op)
        .with_success(failed == 0)
        .with_message(format!("Attached tool {tool_id} to {attached} agents, {failed} failed"))
        .with("tool_id", tool_id)
        .with("results", report.into_results())
        .with("attached_count", attached)
        .with("failed_count", failed))
}

/// Update the tool named `name`, or create it.
///
/// Lookup and write are two separate calls: two concurrent upserts of a new
/// name can both miss the lookup and both create.
async fn upsert(remote: &dyn RemoteCall, req: ToolRequest) -> HubResult<CanonicalResult> {
    let op = ToolOp::Upsert.name();
    let tool_name = required(&req.name, "name", op)?;

    let raw = remote
        .invoke(ApiRequest::get(["tools"]).query("name", tool_name))
        .await
        .context(format!("Looking up tool {tool_name}"))?;
    let existing = extract_list(raw, &["tools"])
        .into_iter()
        .find(|tool| str_field(tool, "name") == Some(tool_name))
        .and_then(|tool| str_field(&tool, "id").map(str::to_string));

    let (action, request) = match existing.as_deref() {
        Some(tool_id) => {
            debug!(tool_id, "Upsert found existing tool");
            ("updated", ApiRequest::patch(["tools", tool_id]))
        }
        None => ("created", ApiRequest::post(["tools"])),
    };
    let raw = remote
        .invoke(request.json(req.tool_body()))
        .await
        .context(format!("Upserting tool {tool_name}"))?;

    Ok(tool_written(op, &raw, req.include_source())
        .with_message(format!("Tool {tool_name} {action}"))
        .with("action", action))
}
