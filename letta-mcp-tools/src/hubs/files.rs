//! `letta_file_folder_ops`: files open in an agent's context and folder attachment.

use async_trait::async_trait;
use letta_mcp_client::{ApiRequest, RemoteCall};
use letta_mcp_core::args::required;
use letta_mcp_core::normalize::{extract_list, project_all, str_field};
use letta_mcp_core::{CanonicalResult, HubResult, UpstreamContext};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::definition::ToolDefinition;
use crate::entities::{agent_detail, FILE, FOLDER};
use crate::hub::{prepare, Hub};
use crate::operation::OperationSet;
use crate::schema::SchemaBuilder;

crate::operations! {
    /// File and folder operations.
    pub enum FileOp for "letta_file_folder_ops" {
        /// Files attached to an agent.
        ListFiles = "list_files" => ["agent_id"],
        /// Open a file in the agent's context window.
        OpenFile = "open_file" => ["agent_id", "file_id"],
        /// Close an open file.
        CloseFile = "close_file" => ["agent_id", "file_id"],
        /// Close every open file.
        CloseAllFiles = "close_all_files" => ["agent_id"],
        /// List folders.
        ListFolders = "list_folders" => [],
        /// Attach a folder to an agent.
        AttachFolder = "attach_folder" => ["agent_id", "folder_id"],
        /// Detach a folder from an agent.
        DetachFolder = "detach_folder" => ["agent_id", "folder_id"],
        /// Agents a folder is attached to.
        ListAgentsInFolder = "list_agents_in_folder" => ["folder_id"],
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileRequest {
    agent_id: Option<String>,
    file_id: Option<String>,
    folder_id: Option<String>,
    limit: Option<u32>,
}

/// File and folder hub.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFolderHub;

#[async_trait]
impl Hub for FileFolderHub {
    fn name(&self) -> &'static str {
        FileOp::TOOL
    }

    fn definition(&self) -> Result<ToolDefinition, serde_json::Error> {
        let schema = SchemaBuilder::new()
            .enum_values("operation", "Operation to perform", &FileOp::names(), true)
            .string("agent_id", "Agent identifier", false)
            .string("file_id", "File identifier (open_file, close_file)", false)
            .string("folder_id", "Folder identifier", false)
            .integer("limit", "Maximum number of results (list_files, list_folders)", false)
            .build()?;
        Ok(ToolDefinition::new(
            self.name(),
            "Manage files in agent context windows and attach folders to agents",
            schema,
        ))
    }

    async fn call(&self, remote: &dyn RemoteCall, args: JsonValue) -> HubResult<CanonicalResult> {
        let (op, req): (FileOp, FileRequest) = prepare(args)?;
        let name = op.name();
        match op {
            FileOp::ListFiles => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let raw = remote
                    .invoke(ApiRequest::get(["agents", agent_id, "files"]).query_opt("limit", req.limit))
                    .await
                    .context(format!("Listing files of agent {agent_id}"))?;
                let files = project_all(&extract_list(raw, &["files"]), FILE);
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Agent {agent_id} has {} files", files.len()))
                    .with_items("files", files))
            }
            FileOp::OpenFile => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let file_id = required(&req.file_id, "file_id", name)?;
                let raw = remote
                    .invoke(ApiRequest::patch(["agents", agent_id, "files", file_id, "open"]))
                    .await
                    .context(format!("Opening file {file_id} for agent {agent_id}"))?;
                let evicted = extract_list(raw, &["evicted_files", "closed_files"]);
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("File {file_id} opened, {} evicted", evicted.len()))
                    .with("file_id", file_id)
                    .with("evicted_files", evicted))
            }
            FileOp::CloseFile => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let file_id = required(&req.file_id, "file_id", name)?;
                remote
                    .invoke(ApiRequest::patch(["agents", agent_id, "files", file_id, "close"]))
                    .await
                    .context(format!("Closing file {file_id} for agent {agent_id}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("File {file_id} closed"))
                    .with("file_id", file_id))
            }
            FileOp::CloseAllFiles => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let raw = remote
                    .invoke(ApiRequest::patch(["agents", agent_id, "files", "close-all"]))
                    .await
                    .context(format!("Closing all files for agent {agent_id}"))?;
                let closed = extract_list(raw, &["closed_files"]);
                let closed_count = closed.len();
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Closed {closed_count} files"))
                    .with("closed_files", closed)
                    .with("closed_count", closed_count))
            }
            FileOp::ListFolders => {
                let raw = remote
                    .invoke(ApiRequest::get(["folders"]).query_opt("limit", req.limit))
                    .await
                    .context("Listing folders")?;
                let folders = project_all(&extract_list(raw, &["folders"]), FOLDER);
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Found {} folders", folders.len()))
                    .with_items("folders", folders))
            }
            FileOp::AttachFolder | FileOp::DetachFolder => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let folder_id = required(&req.folder_id, "folder_id", name)?;
                let (verb, past) = match op {
                    FileOp::AttachFolder => ("attach", "attached to"),
                    _ => ("detach", "detached from"),
                };
                let raw = remote
                    .invoke(ApiRequest::patch(["agents", agent_id, "folders", verb, folder_id]))
                    .await
                    .context(format!("Updating folders of agent {agent_id}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Folder {folder_id} {past} agent {agent_id}"))
                    .with("agent_state", agent_detail(&raw)))
            }
            FileOp::ListAgentsInFolder => {
                let folder_id = required(&req.folder_id, "folder_id", name)?;
                let raw = remote
                    .invoke(ApiRequest::get(["folders", folder_id, "agents"]))
                    .await
                    .context(format!("Listing agents in folder {folder_id}"))?;
                // upstream answers with bare ids or agent objects
                let agent_ids: Vec<String> = extract_list(raw, &["agent_ids", "agents"])
                    .iter()
                    .filter_map(|entry| match entry {
                        JsonValue::String(id) => Some(id.clone()),
                        other => str_field(other, "id").map(str::to_string),
                    })
                    .collect();
                let agents: Vec<JsonValue> = agent_ids.iter().map(|id| json!({"id": id})).collect();
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Folder {folder_id} is attached to {} agents", agent_ids.len()))
                    .with("folder_id", folder_id)
                    .with("agent_ids", agent_ids)
                    .with_items("agents", agents))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use letta_mcp_client::{Method, MockRemote};
    use letta_mcp_core::HubError;
    use pretty_assertions::assert_eq;

    async fn call(remote: &MockRemote, args: JsonValue) -> HubResult<CanonicalResult> {
        FileFolderHub.call(remote, args).await
    }

    #[tokio::test]
    async fn test_list_files_aliases_and_shapes() {
        let files = json!([
            {"id": "f1", "file_name": "notes.md", "file_size": 120, "is_open": true, "last_accessed_at": "2024-02-02T00:00:00Z"},
            {"id": "f2", "filename": "data.csv", "size": 4096, "mime_type": "text/csv", "is_open": false}
        ]);
        let bare = call(
            &MockRemote::new().with_response(files.clone()),
            json!({"operation": "list_files", "agent_id": "a1"}),
        )
        .await
        .unwrap();
        let wrapped = call(
            &MockRemote::new().with_response(json!({"files": files})),
            json!({"operation": "list_files", "agent_id": "a1"}),
        )
        .await
        .unwrap();

        assert_eq!(bare, wrapped);
        assert_eq!(
            bare.get("files"),
            Some(&json!([
                {"id": "f1", "filename": "notes.md", "size": 120, "is_open": true, "opened_at": "2024-02-02T00:00:00Z"},
                {"id": "f2", "filename": "data.csv", "size": 4096, "mime_type": "text/csv", "is_open": false}
            ]))
        );
    }

    #[tokio::test]
    async fn test_open_file_reports_evictions() {
        let remote = MockRemote::new().with_response(json!(["old.txt"]));
        let result = call(&remote, json!({"operation": "open_file", "agent_id": "a1", "file_id": "f1"}))
            .await
            .unwrap();
        let request = remote.last_request().unwrap();
        assert_eq!(request.method(), Method::Patch);
        assert_eq!(request.path(), "/agents/a1/files/f1/open");
        assert_eq!(result.get("evicted_files"), Some(&json!(["old.txt"])));
    }

    #[tokio::test]
    async fn test_close_all_files() {
        let remote = MockRemote::new().with_response(json!(["a.txt", "b.txt"]));
        let result = call(&remote, json!({"operation": "close_all_files", "agent_id": "a1"}))
            .await
            .unwrap();
        assert_eq!(result.get("closed_count"), Some(&json!(2)));
        assert_eq!(remote.last_request().unwrap().path(), "/agents/a1/files/close-all");
    }

    #[tokio::test]
    async fn test_list_agents_in_folder_accepts_ids_or_objects() {
        let remote = MockRemote::new()
            .with_response(json!(["a1", "a2"]))
            .with_response(json!([{"id": "a1", "name": "x"}, {"id": "a2"}]));

        let ids = call(&remote, json!({"operation": "list_agents_in_folder", "folder_id": "fo"}))
            .await
            .unwrap();
        let objects = call(&remote, json!({"operation": "list_agents_in_folder", "folder_id": "fo"}))
            .await
            .unwrap();

        assert_eq!(ids, objects);
        assert_eq!(ids.get("agent_ids"), Some(&json!(["a1", "a2"])));
        assert_eq!(ids.get("agents"), Some(&json!([{"id": "a1"}, {"id": "a2"}])));
        assert_eq!(ids.get("count"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_attach_folder_requires_folder_id() {
        let remote = MockRemote::new();
        let err = call(&remote, json!({"operation": "attach_folder", "agent_id": "a1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::MissingArgument { ref field, .. } if field == "folder_id"));
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_detach_folder_returns_agent_state() {
        let remote = MockRemote::new().with_response(json!({"id": "a1", "name": "bot", "memory": {}}));
        let result = call(
            &remote,
            json!({"operation": "detach_folder", "agent_id": "a1", "folder_id": "fo-1"}),
        )
        .await
        .unwrap();
        assert_eq!(remote.last_request().unwrap().path(), "/agents/a1/folders/detach/fo-1");
        assert_eq!(result.get("agent_state"), Some(&json!({"id": "a1", "name": "bot"})));
    }
}
