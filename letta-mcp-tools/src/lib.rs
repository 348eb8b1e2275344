//! # letta-mcp-tools
//!
//! The hubs: consolidated MCP tools that fan out into many Letta operations
//! through an `operation` discriminator.
//!
//! ## Core Concepts
//!
//! - **[`Hub`]**: one tool; validates arguments, calls the remote platform and
//!   normalizes the answer into a [`CanonicalResult`](letta_mcp_core::CanonicalResult)
//! - **[`operations!`]**: declares a hub's operations as an enum with
//!   wire names and ordered required fields
//! - **[`HubRegistry`]**: the read-only dispatcher built once by [`build_registry`]
//! - **[`SchemaBuilder`]** and **[`ToolDefinition`]**: the schema surface offered to clients
//!
//! ## Example
//!
//! ```rust
//! use letta_mcp_client::MockRemote;
//! use letta_mcp_tools::build_registry;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let registry = build_registry().unwrap();
//! let remote = MockRemote::new().with_response(json!({"jobs": [{"id": "job-1", "status": "running"}]}));
//!
//! let result = registry
//!     .dispatch(&remote, "letta_job_monitor", json!({"operation": "list"}))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(result.get("count"), Some(&json!(1)));
//! # });
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod bulk;
pub mod definition;
pub mod entities;
pub mod hub;
pub mod hubs;
pub mod operation;
pub mod registry;
pub mod schema;

// Re-exports for convenience
pub use bulk::{AgentFilter, BatchReport};
pub use definition::ToolDefinition;
pub use hub::Hub;
pub use hubs::{
    AgentHub, FileFolderHub, JobMonitorHub, McpOpsHub, MemoryHub, SourceManagerHub,
    ToolManagerHub,
};
pub use operation::{resolve, OperationSet};
pub use registry::{build_registry, HubRegistry};
pub use schema::SchemaBuilder;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{build_registry, Hub, HubRegistry, OperationSet, ToolDefinition};
}
