//! # letta-mcp-server
//!
//! Model Context Protocol server exposing the letta-mcp hubs as tools.
//!
//! ## Core Concepts
//!
//! - **[`McpServer`]**: answers JSON-RPC requests by dispatching through a
//!   [`HubRegistry`](letta_mcp_tools::HubRegistry)
//! - **Transports**: newline-delimited stdio ([`McpServer::run_stdio`]) and,
//!   with the `http` feature, an Axum router (`McpServer::serve_http`)
//! - **Error mapping**: hub failures become JSON-RPC errors through
//!   `From<&HubError> for JsonRpcError`
//!
//! ## Feature Flags
//!
//! - `http` (default): the HTTP transport
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use letta_mcp_client::LettaClient;
//! use letta_mcp_server::McpServer;
//! use letta_mcp_tools::build_registry;
//!
//! let client = LettaClient::from_settings(&settings)?;
//! let server = McpServer::new(Arc::new(build_registry()?), Arc::new(client));
//! server.run_stdio().await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod server;
pub mod types;

// Re-exports for convenience
pub use error::{McpError, McpResult};
pub use server::{McpServer, SERVER_NAME};
pub use types::{
    CallToolParams, CallToolResult, Implementation, InitializeResult, JsonRpcError,
    JsonRpcMessage, JsonRpcRequest, JsonRpcResponse, ListToolsResult, McpTool, RequestId,
    PROTOCOL_VERSION,
};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{McpError, McpResult, McpServer};
}
