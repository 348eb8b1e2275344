//! # letta-mcp-core
//!
//! Core types shared by every letta-mcp crate.
//!
//! - **Errors**: [`ApiError`] for failed remote calls, [`HubError`] for dispatch failures
//! - **Validation**: falsy-aware required-field checks in [`args`]
//! - **Normalization**: list extraction, field aliases and allow-list trimming in [`normalize`]
//! - **Results**: the flat [`CanonicalResult`] every operation returns
//! - **Settings**: environment-driven [`Settings`]
//!
//! ## Example
//!
//! ```rust
//! use letta_mcp_core::args::validate_required;
//! use letta_mcp_core::normalize::{extract_list, project_all, Field};
//! use letta_mcp_core::CanonicalResult;
//! use serde_json::json;
//!
//! let args = json!({"operation": "list", "agent_id": "agent-1"});
//! validate_required(&args, &["agent_id"], "list").unwrap();
//!
//! let raw = json!({"jobs": [{"id": "job-1", "status": "running", "extra": 1}]});
//! let jobs = project_all(&extract_list(raw, &["jobs"]), &[Field::Plain("id"), Field::Plain("status")]);
//!
//! let result = CanonicalResult::ok("list").with_items("jobs", jobs);
//! assert_eq!(result.get("count"), Some(&json!(1)));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod args;
pub mod errors;
pub mod normalize;
pub mod result;
pub mod settings;

// Re-exports for convenience
pub use errors::{ApiError, HubError, HubResult, UpstreamContext};
pub use normalize::{aliases, extract_list, project, project_all, resolve_alias, Alias, Field};
pub use result::CanonicalResult;
pub use settings::{LogFormat, Settings, TransportKind};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{ApiError, CanonicalResult, Field, HubError, HubResult, UpstreamContext};
}
