//! The hub abstraction.
//!
//! A hub is one MCP tool that fans out into many operations selected by the
//! `operation` field. Hubs hold no state; everything they need arrives with
//! the call.

use async_trait::async_trait;
use letta_mcp_client::RemoteCall;
use letta_mcp_core::args::decode;
use letta_mcp_core::{CanonicalResult, HubResult};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::info;

use crate::definition::ToolDefinition;
use crate::operation::{resolve, OperationSet};

/// One consolidated tool.
#[async_trait]
pub trait Hub: Send + Sync {
    /// Tool name advertised to clients.
    fn name(&self) -> &'static str;

    /// Static tool definition.
    fn definition(&self) -> Result<ToolDefinition, serde_json::Error>;

    /// Validate `args`, perform the selected operation and normalize the result.
    ///
    /// Validation failures return before `remote` is touched.
    async fn call(&self, remote: &dyn RemoteCall, args: JsonValue) -> HubResult<CanonicalResult>;
}

/// Resolve the operation, then decode the typed request.
///
/// Both steps run before any network call.
pub(crate) fn prepare<O, R>(args: JsonValue) -> HubResult<(O, R)>
where
    O: OperationSet,
    R: DeserializeOwned,
{
    let op: O = resolve(&args)?;
    info!(tool = O::TOOL, operation = op.name(), "Executing operation");
    let request = decode(args, op.name())?;
    Ok((op, request))
}

/// Drop `null` members from a request body so absent options are never sent.
pub(crate) fn compact(body: JsonValue) -> JsonValue {
    match body {
        JsonValue::Object(map) => {
            JsonValue::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect())
        }
        other => other,
    }
}
