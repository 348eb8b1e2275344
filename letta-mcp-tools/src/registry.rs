//! The hub registry and dispatcher.
//!
//! [`build_registry`] assembles every hub once at startup. The registry is
//! never mutated afterwards, so it can be shared behind an `Arc` and read
//! from any number of concurrent calls without locking.

use std::sync::Arc;

use indexmap::IndexMap;
use letta_mcp_client::RemoteCall;
use letta_mcp_core::{CanonicalResult, HubError, HubResult};
use serde_json::Value as JsonValue;

use crate::definition::ToolDefinition;
use crate::hub::Hub;
use crate::hubs::{
    AgentHub, FileFolderHub, JobMonitorHub, McpOpsHub, MemoryHub, SourceManagerHub,
    ToolManagerHub,
};

struct Entry {
    definition: ToolDefinition,
    hub: Arc<dyn Hub>,
}

/// Registered hubs keyed by tool name, in registration order.
///
/// # Example
///
/// ```rust
/// use letta_mcp_tools::build_registry;
///
/// # fn main() -> Result<(), letta_mcp_core::HubError> {
/// let registry = build_registry()?;
/// assert!(registry.contains("letta_memory_unified"));
/// assert_eq!(registry.definitions().len(), registry.len());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct HubRegistry {
    hubs: IndexMap<String, Entry>,
}

impl HubRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hub, generating its definition.
    ///
    /// Fails if the name is taken or the definition cannot be built.
    pub fn register<H: Hub + 'static>(&mut self, hub: H) -> HubResult<&mut Self> {
        let definition = hub.definition()?;
        let name = definition.name.clone();
        if self.hubs.contains_key(&name) {
            return Err(HubError::configuration(format!(
                "tool '{name}' is already registered"
            )));
        }
        self.hubs.insert(
            name,
            Entry {
                definition,
                hub: Arc::new(hub),
            },
        );
        Ok(self)
    }

    /// All tool definitions, in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.hubs.values().map(|e| e.definition.clone()).collect()
    }

    /// Definition of one tool.
    #[must_use]
    pub fn definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.hubs.get(name).map(|e| &e.definition)
    }

    /// Route a call to the named hub.
    ///
    /// # Errors
    ///
    /// Returns `HubError::ToolNotFound` for unregistered names, otherwise
    /// whatever the hub returns.
    pub async fn dispatch(
        &self,
        remote: &dyn RemoteCall,
        tool: &str,
        args: JsonValue,
    ) -> HubResult<CanonicalResult> {
        let entry = self
            .hubs
            .get(tool)
            .ok_or_else(|| HubError::tool_not_found(tool))?;
        entry.hub.call(remote, args).await
    }

    /// Get a hub by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Hub>> {
        self.hubs.get(name).map(|e| &e.hub)
    }

    /// Check if a tool exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.hubs.contains_key(name)
    }

    /// Number of registered hubs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    /// Whether no hub is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }

    /// Tool names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.hubs.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for HubRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

/// Build the registry holding every hub.
pub fn build_registry() -> HubResult<HubRegistry> {
    let mut registry = HubRegistry::new();
    registry
        .register(AgentHub)?
        .register(MemoryHub)?
        .register(ToolManagerHub)?
        .register(SourceManagerHub)?
        .register(JobMonitorHub)?
        .register(FileFolderHub)?
        .register(McpOpsHub)?;
    Ok(registry)
}
