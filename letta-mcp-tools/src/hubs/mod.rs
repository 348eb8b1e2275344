//! The consolidated hubs, one per tool.

mod agents;
mod files;
mod jobs;
mod mcp_ops;
mod memory;
mod sources;
mod tool_manager;

pub use agents::{AgentHub, AgentOp};
pub use files::{FileFolderHub, FileOp};
pub use jobs::{JobMonitorHub, JobOp};
pub use mcp_ops::{McpOp, McpOpsHub};
pub use memory::{MemoryHub, MemoryOp};
pub use sources::{SourceManagerHub, SourceOp};
pub use tool_manager::{ToolManagerHub, ToolOp};
