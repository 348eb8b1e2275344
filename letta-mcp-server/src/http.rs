//! HTTP transport.
//!
//! `POST /mcp` takes one JSON-RPC message and answers with its response, or
//! `202 Accepted` with an empty body for notifications. `GET /health` reports
//! liveness. Only available with the `http` feature.

use std::net::SocketAddr;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{McpError, McpResult};
use crate::server::{McpServer, SERVER_NAME};

impl McpServer {
    /// Create an Axum router for the MCP endpoints.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/mcp", post(handle_rpc))
            .route("/health", get(health_check))
            .with_state(self.clone())
    }

    /// Serve HTTP on the given address until the server stops.
    pub async fn serve_http(self, addr: impl Into<SocketAddr>) -> McpResult<()> {
        let addr = addr.into();
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| McpError::Bind(e.to_string()))?;

        info!(%addr, tools = self.tool_count(), "Serving MCP over HTTP");

        axum::serve(listener, router)
            .await
            .map_err(|e| McpError::Serve(e.to_string()))?;

        Ok(())
    }
}

/// POST /mcp - one JSON-RPC message
async fn handle_rpc(State(server): State<McpServer>, body: String) -> Response {
    match server.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// GET /health - Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": SERVER_NAME
    }))
}
