//! # letta-mcp-client
//!
//! The remote call adapter: everything that talks to the Letta REST API.
//!
//! ## Core Concepts
//!
//! - **[`ApiRequest`]**: method, raw path segments, query and body for one call
//! - **[`RemoteCall`]**: the adapter seam hubs are written against
//! - **[`LettaClient`]**: the reqwest implementation (bearer auth, JSON, SSE)
//! - **[`MockRemote`]**: a recording implementation for tests
//!
//! ## Example
//!
//! ```ignore
//! use letta_mcp_client::{ApiRequest, LettaClient, RemoteCall};
//! use letta_mcp_core::Settings;
//!
//! let settings = Settings::from_env()?;
//! let client = LettaClient::from_settings(&settings)?;
//!
//! let agents = client.invoke(ApiRequest::get(["agents"]).query("limit", 10)).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod mock;
pub mod request;

use async_trait::async_trait;
use letta_mcp_core::ApiError;
use serde_json::Value as JsonValue;

pub use client::LettaClient;
pub use mock::MockRemote;
pub use request::{ApiRequest, FilePart, Method, RequestBody};

/// Executes one request against the remote platform.
///
/// Implementations make exactly one network call per invocation and surface
/// failures unchanged.
#[async_trait]
pub trait RemoteCall: Send + Sync {
    /// Send the request and return the decoded response body.
    async fn invoke(&self, request: ApiRequest) -> Result<JsonValue, ApiError>;
}
