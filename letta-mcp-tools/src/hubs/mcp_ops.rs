//! `letta_mcp_ops`: MCP servers registered with the remote platform.

use async_trait::async_trait;
use letta_mcp_client::{ApiRequest, RemoteCall};
use letta_mcp_core::args::{required, required_value};
use letta_mcp_core::normalize::{extract_list, project_all, Field};
use letta_mcp_core::{CanonicalResult, HubResult, UpstreamContext};
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};

use crate::definition::ToolDefinition;
use crate::hub::{prepare, Hub};
use crate::operation::OperationSet;
use crate::schema::SchemaBuilder;

const MCP_TOOL: &[Field] = &[Field::Plain("name"), Field::Plain("description")];

crate::operations! {
    /// MCP server operations.
    pub enum McpOp for "letta_mcp_ops" {
        /// Register a server.
        Add = "add" => ["server_config"],
        /// Replace a server's configuration.
        Update = "update" => ["server_name", "server_config"],
        /// Remove a server.
        Delete = "delete" => ["server_name"],
        /// Check that a configuration connects.
        Test = "test" => ["server_config"],
        /// Connect to a server.
        Connect = "connect" => ["server_config"],
        /// Refresh a server's tool list.
        Resync = "resync" => ["server_name"],
        /// Run a server tool.
        Execute = "execute" => ["server_name", "tool_name"],
        /// List registered servers.
        ListServers = "list_servers" => [],
        /// Tools offered by a server.
        ListTools = "list_tools" => ["server_name"],
        /// Import a server tool as a platform tool.
        RegisterTool = "register_tool" => ["server_name", "tool_name"],
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct McpRequest {
    server_name: Option<String>,
    server_config: Option<JsonValue>,
    tool_name: Option<String>,
    tool_args: Option<JsonValue>,
}

/// MCP server management hub.
#[derive(Debug, Clone, Copy, Default)]
pub struct McpOpsHub;

#[async_trait]
impl Hub for McpOpsHub {
    fn name(&self) -> &'static str {
        McpOp::TOOL
    }

    fn definition(&self) -> Result<ToolDefinition, serde_json::Error> {
        let schema = SchemaBuilder::new()
            .enum_values("operation", "Operation to perform", &McpOp::names(), true)
            .string("server_name", "Registered server name", false)
            .object(
                "server_config",
                "Server configuration, e.g. {\"server_name\": \"fs\", \"type\": \"stdio\", \"command\": \"npx\"}",
                false,
            )
            .string("tool_name", "Server tool name (execute, register_tool)", false)
            .object("tool_args", "Arguments passed to the tool (execute)", false)
            .build()?;
        Ok(ToolDefinition::new(
            self.name(),
            "Manage MCP servers connected to Letta: add, update, test, resync, list and run their tools",
            schema,
        ))
    }

    async fn call(&self, remote: &dyn RemoteCall, args: JsonValue) -> HubResult<CanonicalResult> {
        let (op, req): (McpOp, McpRequest) = prepare(args)?;
        let name = op.name();
        match op {
            McpOp::Add => {
                let config = required_value(&req.server_config, "server_config", name)?;
                let raw = remote
                    .invoke(ApiRequest::put(["tools", "mcp", "servers"]).json(config.clone()))
                    .await
                    .context("Adding MCP server")?;
                Ok(CanonicalResult::ok(name)
                    .with_message("MCP server added")
                    .with("servers", flatten_servers(raw)))
            }
            McpOp::Update => {
                let server = required(&req.server_name, "server_name", name)?;
                let config = required_value(&req.server_config, "server_config", name)?;
                let raw = remote
                    .invoke(ApiRequest::patch(["tools", "mcp", "servers", server]).json(config.clone()))
                    .await
                    .context(format!("Updating MCP server {server}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("MCP server {server} updated"))
                    .with("server", raw))
            }
            McpOp::Delete => {
                let server = required(&req.server_name, "server_name", name)?;
                let raw = remote
                    .invoke(ApiRequest::delete(["tools", "mcp", "servers", server]))
                    .await
                    .context(format!("Deleting MCP server {server}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("MCP server {server} deleted"))
                    .with("servers", flatten_servers(raw)))
            }
            McpOp::Test | McpOp::Connect => {
                let config = required_value(&req.server_config, "server_config", name)?;
                let raw = remote
                    .invoke(ApiRequest::post(["tools", "mcp", "servers", name]).json(config.clone()))
                    .await
                    .context(format!("Running MCP server {name}"))?;
                let tools = project_all(&extract_list(raw, &["tools"]), MCP_TOOL);
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("MCP server {name} succeeded with {} tools", tools.len()))
                    .with_items("tools", tools))
            }
            McpOp::Resync => {
                let server = required(&req.server_name, "server_name", name)?;
                let raw = remote
                    .invoke(ApiRequest::patch(["tools", "mcp", "servers", server, "resync"]))
                    .await
                    .context(format!("Resyncing MCP server {server}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("MCP server {server} resynced"))
                    .with("data", raw))
            }
            McpOp::Execute => {
                let server = required(&req.server_name, "server_name", name)?;
                let tool = required(&req.tool_name, "tool_name", name)?;
                let args = req.tool_args.clone().unwrap_or_else(|| json!({}));
                let raw = remote
                    .invoke(
                        ApiRequest::post(["tools", "mcp", "servers", server, "tools", tool, "execute"])
                            .json(json!({"args": args})),
                    )
                    .await
                    .context(format!("Executing {tool} on MCP server {server}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Tool {tool} executed"))
                    .with("result", raw))
            }
            McpOp::ListServers => {
                let raw = remote
                    .invoke(ApiRequest::get(["tools", "mcp", "servers"]))
                    .await
                    .context("Listing MCP servers")?;
                let servers = flatten_servers(raw);
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Found {} MCP servers", servers.len()))
                    .with_items("servers", servers))
            }
            McpOp::ListTools => {
                let server = required(&req.server_name, "server_name", name)?;
                let raw = remote
                    .invoke(ApiRequest::get(["tools", "mcp", "servers", server, "tools"]))
                    .await
                    .context(format!("Listing tools of MCP server {server}"))?;
                let tools = project_all(&extract_list(raw, &["tools"]), MCP_TOOL);
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("MCP server {server} offers {} tools", tools.len()))
                    .with_items("tools", tools))
            }
            McpOp::RegisterTool => {
                let server = required(&req.server_name, "server_name", name)?;
                let tool = required(&req.tool_name, "tool_name", name)?;
                let raw = remote
                    .invoke(ApiRequest::post(["tools", "mcp", "servers", server, tool]))
                    .await
                    .context(format!("Registering {tool} from MCP server {server}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Tool {tool} registered"))
                    .with_opt("tool_id", raw.get("id").cloned())
                    .with("tool", raw))
            }
        }
    }
}

/// Server listings come back as an object keyed by server name; each entry
/// becomes `{name, ...config}`. Arrays pass through.
fn flatten_servers(raw: JsonValue) -> Vec<JsonValue> {
    match raw {
        JsonValue::Object(map) => map
            .into_iter()
            .map(|(server, config)| {
                let mut entry = Map::new();
                entry.insert("name".to_string(), JsonValue::String(server));
                if let JsonValue::Object(fields) = config {
                    entry.extend(fields.into_iter().filter(|(key, _)| key != "name"));
                }
                JsonValue::Object(entry)
            })
            .collect(),
        other => extract_list(other, &["servers"]),
    }
}
