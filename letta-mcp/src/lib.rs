//! # letta-mcp
//!
//! An MCP server that exposes the Letta agent platform's REST API as a small
//! set of consolidated tools. Each tool is a hub: one `operation` argument
//! selects among many related operations (agents, memory, tools, sources,
//! jobs, files and folders, MCP servers).
//!
//! ## Quick Start
//!
//! ```bash
//! LETTA_BASE_URL=http://localhost:8283 LETTA_PASSWORD=secret letta-mcp
//! ```
//!
//! Or embed it:
//!
//! ```ignore
//! use std::sync::Arc;
//! use letta_mcp::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let client = LettaClient::from_settings(&settings)?;
//!     let server = McpServer::new(Arc::new(build_registry()?), Arc::new(client));
//!     server.run_stdio().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `http` (default): serve JSON-RPC over HTTP when `TRANSPORT=http`

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// Crate Re-exports
// ============================================================================

/// Errors, results, normalization and settings.
pub use letta_mcp_core as core;

/// The remote call adapter.
pub use letta_mcp_client as client;

/// Hubs, schemas and the dispatch registry.
pub use letta_mcp_tools as tools;

/// The MCP protocol server.
pub use letta_mcp_server as server;

// ============================================================================
// Flat Re-exports
// ============================================================================

pub use letta_mcp_client::{LettaClient, RemoteCall};
pub use letta_mcp_core::{ApiError, CanonicalResult, HubError, HubResult, Settings};
pub use letta_mcp_server::McpServer;
pub use letta_mcp_tools::{build_registry, HubRegistry};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        build_registry, CanonicalResult, HubError, HubRegistry, LettaClient, McpServer,
        RemoteCall, Settings,
    };
}
