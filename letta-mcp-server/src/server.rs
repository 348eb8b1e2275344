//! MCP server.
//!
//! Answers `initialize`, `tools/list`, `tools/call` and `ping` by routing
//! tool calls through a [`HubRegistry`]. The registry and the remote adapter
//! are shared read-only, so any number of calls may run concurrently; the
//! stdio loop handles every message on its own task.

use std::sync::Arc;

use letta_mcp_client::RemoteCall;
use letta_mcp_tools::HubRegistry;
use serde_json::{json, Value as JsonValue};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{McpError, McpResult};
use crate::types::{
    CallToolParams, CallToolResult, Implementation, InitializeResult, JsonRpcError,
    JsonRpcMessage, JsonRpcRequest, JsonRpcResponse, ListToolsResult, McpTool, RequestId,
    ServerCapabilities, ToolsCapability, PROTOCOL_VERSION,
};

/// Name announced in `serverInfo`.
pub const SERVER_NAME: &str = "letta-mcp-server";

/// MCP server over a fixed set of hubs.
#[derive(Clone)]
pub struct McpServer {
    info: Implementation,
    capabilities: ServerCapabilities,
    tools: Arc<Vec<McpTool>>,
    registry: Arc<HubRegistry>,
    remote: Arc<dyn RemoteCall>,
}

impl McpServer {
    /// Create a server dispatching to `registry` through `remote`.
    pub fn new(registry: Arc<HubRegistry>, remote: Arc<dyn RemoteCall>) -> Self {
        let tools = registry
            .definitions()
            .into_iter()
            .map(McpTool::from)
            .collect();
        Self {
            info: Implementation::new(SERVER_NAME, env!("CARGO_PKG_VERSION")),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
            tools: Arc::new(tools),
            registry,
            remote,
        }
    }

    /// Run the server on stdio until stdin closes.
    pub async fn run_stdio(&self) -> McpResult<()> {
        info!(tools = self.tool_count(), "Serving MCP over stdio");
        self.serve_lines(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await?;
        info!("stdin closed, shutting down");
        Ok(())
    }

    /// Serve newline-delimited JSON-RPC from `reader` to `writer`.
    ///
    /// Each message is handled on its own task, so a slow tool call does not
    /// hold up later requests. Responses are written one line each, in
    /// completion order, by a single writer task. Returns once the input
    /// ends and every in-flight request has been answered.
    pub async fn serve_lines<R, W>(&self, mut reader: R, writer: W) -> McpResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer = tokio::spawn(write_responses(rx, writer));
        let mut line = String::new();

        loop {
            line.clear();
            let n = reader.read_line(&mut line).await?;
            if n == 0 {
                break;
            }

            let message = line.trim().to_string();
            if message.is_empty() {
                continue;
            }

            let server = self.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(response) = server.handle_message(&message).await {
                    // the writer only stops early on an output error
                    let _ = tx.send(response);
                }
            });
        }

        // the writer drains until the last in-flight request drops its sender
        drop(tx);
        writer
            .await
            .map_err(|e| McpError::Io(std::io::Error::other(e)))?
    }

    /// Handle one raw message. Notifications produce no response.
    pub async fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let value: JsonValue = match serde_json::from_str(message) {
            Ok(v) => v,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    RequestId::Null,
                    JsonRpcError::PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };
        self.handle_value(value).await
    }

    /// Handle one already-parsed message.
    pub async fn handle_value(&self, value: JsonValue) -> Option<JsonRpcResponse> {
        let request = match serde_json::from_value(value) {
            Ok(JsonRpcMessage::Request(request)) => request,
            Ok(JsonRpcMessage::Notification(notification)) => {
                debug!(method = %notification.method, "Ignoring notification");
                return None;
            }
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    RequestId::Null,
                    JsonRpcError::INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                ));
            }
        };

        debug!(method = %request.method, "Handling request");
        Some(self.handle_request(request).await)
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => {
                let result = InitializeResult {
                    protocol_version: PROTOCOL_VERSION.to_string(),
                    capabilities: self.capabilities.clone(),
                    server_info: self.info.clone(),
                    instructions: None,
                };
                JsonRpcResponse::success(request.id, result)
            }
            "tools/list" => {
                let result = ListToolsResult {
                    tools: self.tools.as_ref().clone(),
                    next_cursor: None,
                };
                JsonRpcResponse::success(request.id, result)
            }
            "tools/call" => self.call_tool(request.id, request.params).await,
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            _ => JsonRpcResponse::error(
                request.id,
                JsonRpcError::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    async fn call_tool(&self, id: RequestId, params: Option<JsonValue>) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::INVALID_PARAMS,
                    format!("Invalid params: {}", e),
                );
            }
            None => {
                return JsonRpcResponse::error(id, JsonRpcError::INVALID_PARAMS, "Missing params");
            }
        };

        let outcome = self
            .registry
            .dispatch(self.remote.as_ref(), &params.name, params.arguments)
            .await
            .and_then(|result| result.to_json_string());

        match outcome {
            Ok(text) => JsonRpcResponse::success(id, CallToolResult::text(text)),
            Err(err) => {
                warn!(tool = %params.name, error = %err, "Tool call failed");
                JsonRpcResponse::failure(id, JsonRpcError::from(&err))
            }
        }
    }

    /// Get server info.
    pub fn info(&self) -> &Implementation {
        &self.info
    }

    /// Number of advertised tools.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

async fn write_responses<W>(
    mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>,
    mut writer: W,
) -> McpResult<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let json = serde_json::to_string(&response)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("info", &self.info)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use letta_mcp_client::{ApiRequest, MockRemote};
    use letta_mcp_core::ApiError;
    use letta_mcp_tools::build_registry;
    use pretty_assertions::assert_eq;
    use tokio::sync::Notify;

    fn server(remote: MockRemote) -> McpServer {
        McpServer::new(Arc::new(build_registry().unwrap()), Arc::new(remote))
    }

    fn tool_call(name: &str, arguments: JsonValue) -> String {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_handle_initialize() {
        let server = server(MockRemote::new());
        let message = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#;
        let response = server.handle_message(message).await.unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "letta-mcp-server");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_handle_tools_list() {
        let server = server(MockRemote::new());
        let message = r#"{"jsonrpc":"2.0","id":"a","method":"tools/list"}"#;
        let response = server.handle_message(message).await.unwrap();

        assert_eq!(response.id, RequestId::from("a"));
        let result: ListToolsResult = serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(result.tools.len(), 7);
        assert_eq!(result.tools[0].name, "letta_agent_advanced");
        assert_eq!(result.tools[0].input_schema["required"], json!(["operation"]));
    }

    #[tokio::test]
    async fn test_tools_call_wraps_pretty_json() {
        let remote = MockRemote::new().with_response(json!([{"id": "job-1", "status": "running"}]));
        let server = server(remote);
        let response = server
            .handle_message(&tool_call("letta_job_monitor", json!({"operation": "list"})))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["isError"], false);
        assert_eq!(result["content"][0]["type"], "text");
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains('\n'));
        let payload: JsonValue = serde_json::from_str(text).unwrap();
        assert_eq!(payload["success"], true);
        assert_eq!(payload["operation"], "list");
        assert_eq!(payload["count"], 1);
    }

    #[tokio::test]
    async fn test_tools_call_validation_error() {
        let remote = MockRemote::new();
        let server = server(remote.clone());
        let response = server
            .handle_message(&tool_call("letta_agent_advanced", json!({"operation": "get"})))
            .await
            .unwrap();

        let error = response.error.unwrap();
        assert_eq!(error.code, JsonRpcError::INVALID_PARAMS);
        assert_eq!(error.message, "agent_id is required for get operation");
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_tools_call_upstream_not_found() {
        let remote = MockRemote::new().with_error(ApiError::from_status(404, "Agent not found"));
        let server = server(remote);
        let response = server
            .handle_message(&tool_call(
                "letta_agent_advanced",
                json!({"operation": "get", "agent_id": "a1"}),
            ))
            .await
            .unwrap();

        let error = response.error.unwrap();
        assert_eq!(error.code, JsonRpcError::INVALID_REQUEST);
        assert_eq!(error.data, Some(json!({"status": 404, "body": "Agent not found"})));
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool() {
        let server = server(MockRemote::new());
        let response = server
            .handle_message(&tool_call("letta_nope", json!({"operation": "list"})))
            .await
            .unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, JsonRpcError::INVALID_PARAMS);
        assert_eq!(error.message, "Tool not found: letta_nope");
    }

    #[tokio::test]
    async fn test_tools_call_missing_params() {
        let server = server(MockRemote::new());
        let message = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call"}"#;
        let response = server.handle_message(message).await.unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_handle_ping() {
        let server = server(MockRemote::new());
        let message = r#"{"jsonrpc":"2.0","id":9,"method":"ping"}"#;
        let response = server.handle_message(message).await.unwrap();
        assert_eq!(response.result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_handle_unknown_method() {
        let server = server(MockRemote::new());
        let message = r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#;
        let response = server.handle_message(message).await.unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handle_parse_error() {
        let server = server(MockRemote::new());
        let response = server.handle_message("{not json").await.unwrap();
        assert_eq!(response.id, RequestId::Null);
        assert_eq!(response.error.unwrap().code, JsonRpcError::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_handle_invalid_request() {
        let server = server(MockRemote::new());
        let response = server.handle_message(r#"{"jsonrpc":"2.0","id":1}"#).await.unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_handle_notification() {
        let server = server(MockRemote::new());
        let message = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        assert!(server.handle_message(message).await.is_none());
    }

    /// Holds every call until the gate opens.
    struct GatedRemote {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl RemoteCall for GatedRemote {
        async fn invoke(&self, _request: ApiRequest) -> Result<JsonValue, ApiError> {
            self.gate.notified().await;
            Ok(json!([{"id": "job-1", "status": "running"}]))
        }
    }

    #[tokio::test]
    async fn test_serve_lines_answers_ping_while_call_pending() {
        let gate = Arc::new(Notify::new());
        let server = McpServer::new(
            Arc::new(build_registry().unwrap()),
            Arc::new(GatedRemote { gate: gate.clone() }),
        );
        let input = format!(
            "{}\n\n{}\n",
            tool_call("letta_job_monitor", json!({"operation": "list"})),
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#
        );
        let (client, server_side) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(async move { server.serve_lines(input.as_bytes(), server_side).await });

        let mut lines = BufReader::new(client).lines();
        let first: JsonValue = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(first["id"], 2);
        assert_eq!(first["result"], json!({}));

        gate.notify_one();
        let second: JsonValue = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(second["id"], 1);
        assert_eq!(second["result"]["isError"], false);

        task.await.unwrap().unwrap();
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_serve_lines_skips_notifications() {
        let server = server(MockRemote::new());
        let input = concat!(
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n"
        );
        let (client, server_side) = tokio::io::duplex(4096);
        server.serve_lines(input.as_bytes(), server_side).await.unwrap();

        let mut lines = BufReader::new(client).lines();
        let only: JsonValue = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(only["id"], 1);
        assert!(lines.next_line().await.unwrap().is_none());
    }
}
