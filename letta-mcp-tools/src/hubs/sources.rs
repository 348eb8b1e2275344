//! `letta_source_manager`: data sources, their files and agent attachment.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use letta_mcp_client::{ApiRequest, FilePart, RemoteCall};
use letta_mcp_core::args::required;
use letta_mcp_core::normalize::{extract_list, project, project_all, str_field, strip_fields};
use letta_mcp_core::{CanonicalResult, HubError, HubResult, UpstreamContext};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::definition::ToolDefinition;
use crate::entities::{AGENT_SUMMARY, FOLDER, JOB, SOURCE, SOURCE_FILE};
use crate::hub::{compact, prepare, Hub};
use crate::operation::OperationSet;
use crate::schema::SchemaBuilder;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

crate::operations! {
    /// Source manager operations.
    pub enum SourceOp for "letta_source_manager" {
        /// List sources.
        List = "list" => [],
        /// Fetch one source.
        Get = "get" => ["source_id"],
        /// Create a source.
        Create = "create" => ["name"],
        /// Change a source.
        Update = "update" => ["source_id"],
        /// Delete a source.
        Delete = "delete" => ["source_id"],
        /// Attach a source to an agent.
        Attach = "attach" => ["agent_id", "source_id"],
        /// Detach a source from an agent.
        Detach = "detach" => ["agent_id", "source_id"],
        /// Sources attached to an agent.
        ListAttached = "list_attached" => ["agent_id"],
        /// Upload a base64 file into a source.
        Upload = "upload" => ["source_id", "file_name", "file_data"],
        /// Remove a file from a source.
        DeleteFiles = "delete_files" => ["source_id", "file_id"],
        /// Files of a source.
        ListFiles = "list_files" => ["source_id"],
        /// Count sources.
        Count = "count" => [],
        /// Agents that have a source attached.
        ListAgentsUsing = "list_agents_using" => ["source_id"],
        /// List folders.
        ListFolders = "list_folders" => [],
        /// Files inside a folder.
        GetFolderContents = "get_folder_contents" => ["folder_id"],
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SourceRequest {
    source_id: Option<String>,
    agent_id: Option<String>,
    folder_id: Option<String>,
    file_id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    instructions: Option<String>,
    metadata: Option<JsonValue>,
    embedding_config: Option<JsonValue>,
    file_name: Option<String>,
    file_data: Option<String>,
    content_type: Option<String>,
    include_content: Option<bool>,
    limit: Option<u32>,
}

impl SourceRequest {
    fn source_body(&self) -> JsonValue {
        compact(json!({
            "name": self.name,
            "description": self.description,
            "instructions": self.instructions,
            "metadata": self.metadata,
            "embedding_config": self.embedding_config,
        }))
    }
}

/// Data source hub.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceManagerHub;

#[async_trait]
impl Hub for SourceManagerHub {
    fn name(&self) -> &'static str {
        SourceOp::TOOL
    }

    fn definition(&self) -> Result<ToolDefinition, serde_json::Error> {
        let schema = SchemaBuilder::new()
            .enum_values("operation", "Operation to perform", &SourceOp::names(), true)
            .string("source_id", "Source identifier", false)
            .string("agent_id", "Agent identifier (attach, detach, list_attached)", false)
            .string("folder_id", "Folder identifier (get_folder_contents)", false)
            .string("file_id", "File identifier (delete_files)", false)
            .string("name", "Source name (create, update)", false)
            .string("description", "Source description", false)
            .string("instructions", "How agents should use the source", false)
            .object("metadata", "Free-form source metadata", false)
            .object("embedding_config", "Embedding configuration (create)", false)
            .string("file_name", "Name of the uploaded file (upload)", false)
            .string("file_data", "Base64-encoded file content (upload)", false)
            .string("content_type", "MIME type of the upload, default application/octet-stream", false)
            .boolean("include_content", "Return file content (list_files, default false)", false)
            .integer("limit", "Maximum number of results", false)
            .build()?;
        Ok(ToolDefinition::new(
            self.name(),
            "Manage data sources: CRUD, file uploads, attaching sources to agents and browsing folders",
            schema,
        ))
    }

    async fn call(&self, remote: &dyn RemoteCall, args: JsonValue) -> HubResult<CanonicalResult> {
        let (op, req): (SourceOp, SourceRequest) = prepare(args)?;
        let name = op.name();
        match op {
            SourceOp::List => {
                let raw = remote
                    .invoke(ApiRequest::get(["sources"]))
                    .await
                    .context("Listing sources")?;
                Ok(source_list(name, raw))
            }
            SourceOp::Get => {
                let source_id = required(&req.source_id, "source_id", name)?;
                let raw = remote
                    .invoke(ApiRequest::get(["sources", source_id]))
                    .await
                    .context(format!("Getting source {source_id}"))?;
                Ok(source_result(name, &raw).with_message(format!("Source {source_id} retrieved")))
            }
            SourceOp::Create => {
                let source_name = required(&req.name, "name", name)?;
                let raw = remote
                    .invoke(ApiRequest::post(["sources"]).json(req.source_body()))
                    .await
                    .context(format!("Creating source {source_name}"))?;
                Ok(source_result(name, &raw)
                    .with_message(format!("Source {source_name} created"))
                    .with_opt("source_id", raw.get("id").cloned()))
            }
            SourceOp::Update => {
                let source_id = required(&req.source_id, "source_id", name)?;
                let raw = remote
                    .invoke(ApiRequest::patch(["sources", source_id]).json(req.source_body()))
                    .await
                    .context(format!("Updating source {source_id}"))?;
                Ok(source_result(name, &raw).with_message(format!("Source {source_id} updated")))
            }
            SourceOp::Delete => {
                let source_id = required(&req.source_id, "source_id", name)?;
                remote
                    .invoke(ApiRequest::delete(["sources", source_id]))
                    .await
                    .context(format!("Deleting source {source_id}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Source {source_id} deleted"))
                    .with("source_id", source_id))
            }
            SourceOp::Attach | SourceOp::Detach => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let source_id = required(&req.source_id, "source_id", name)?;
                let (verb, past) = match op {
                    SourceOp::Attach => ("attach", "attached to"),
                    _ => ("detach", "detached from"),
                };
                remote
                    .invoke(ApiRequest::patch(["agents", agent_id, "sources", verb, source_id]))
                    .await
                    .context(format!("Updating sources of agent {agent_id}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Source {source_id} {past} agent {agent_id}"))
                    .with("agent_id", agent_id)
                    .with("source_id", source_id))
            }
            SourceOp::ListAttached => {
                let agent_id = required(&req.agent_id, "agent_id", name)?;
                let raw = remote
                    .invoke(ApiRequest::get(["agents", agent_id, "sources"]))
                    .await
                    .context(format!("Listing sources of agent {agent_id}"))?;
                Ok(source_list(name, raw).with("agent_id", agent_id))
            }
            SourceOp::Upload => {
                let source_id = required(&req.source_id, "source_id", name)?;
                let file_name = required(&req.file_name, "file_name", name)?;
                let encoded = required(&req.file_data, "file_data", name)?;
                let data = STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| HubError::invalid_args(format!("file_data is not valid base64: {e}")))?;
                let part = FilePart {
                    file_name: file_name.to_string(),
                    content_type: req
                        .content_type
                        .clone()
                        .filter(|ct| !ct.is_empty())
                        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                    data,
                };
                let raw = remote
                    .invoke(ApiRequest::post(["sources", source_id, "upload"]).file(part))
                    .await
                    .context(format!("Uploading {file_name} to source {source_id}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Upload of {file_name} started"))
                    .with("job", project(&raw, JOB)))
            }
            SourceOp::DeleteFiles => {
                let source_id = required(&req.source_id, "source_id", name)?;
                let file_id = required(&req.file_id, "file_id", name)?;
                remote
                    .invoke(ApiRequest::delete(["sources", source_id, "files", file_id]))
                    .await
                    .context(format!("Deleting file {file_id} from source {source_id}"))?;
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("File {file_id} deleted"))
                    .with("file_id", file_id))
            }
            SourceOp::ListFiles => {
                let source_id = required(&req.source_id, "source_id", name)?;
                let raw = remote
                    .invoke(ApiRequest::get(["sources", source_id, "files"]).query_opt("limit", req.limit))
                    .await
                    .context(format!("Listing files of source {source_id}"))?;
                let mut files = project_all(&extract_list(raw, &["files"]), SOURCE_FILE);
                if !req.include_content.unwrap_or(false) {
                    files.iter_mut().for_each(|file| strip_fields(file, &["content"]));
                }
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Source {source_id} has {} files", files.len()))
                    .with_items("files", files))
            }
            SourceOp::Count => {
                let raw = remote
                    .invoke(ApiRequest::get(["sources", "count"]))
                    .await
                    .context("Counting sources")?;
                let count = raw.get("count").cloned().unwrap_or(raw);
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Source count: {count}"))
                    .with("count", count))
            }
            SourceOp::ListAgentsUsing => {
                let source_id = required(&req.source_id, "source_id", name)?;
                list_agents_using(remote, source_id).await
            }
            SourceOp::ListFolders => {
                let raw = remote
                    .invoke(ApiRequest::get(["folders"]))
                    .await
                    .context("Listing folders")?;
                let folders = project_all(&extract_list(raw, &["folders"]), FOLDER);
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Found {} folders", folders.len()))
                    .with_items("folders", folders))
            }
            SourceOp::GetFolderContents => {
                let folder_id = required(&req.folder_id, "folder_id", name)?;
                let raw = remote
                    .invoke(ApiRequest::get(["folders", folder_id, "files"]))
                    .await
                    .context(format!("Listing contents of folder {folder_id}"))?;
                let mut files = project_all(&extract_list(raw, &["files"]), SOURCE_FILE);
                if !req.include_content.unwrap_or(false) {
                    files.iter_mut().for_each(|file| strip_fields(file, &["content"]));
                }
                Ok(CanonicalResult::ok(name)
                    .with_message(format!("Folder {folder_id} holds {} files", files.len()))
                    .with("folder_id", folder_id)
                    .with_items("files", files))
            }
        }
    }
}

/// Agents whose attached sources include `source_id`, checked one agent at a time.
async fn list_agents_using(remote: &dyn RemoteCall, source_id: &str) -> HubResult<CanonicalResult> {
    let raw = remote
        .invoke(ApiRequest::get(["agents"]))
        .await
        .context("Listing agents")?;

    let mut using = Vec::new();
    for agent in extract_list(raw, &["agents"]) {
        let Some(agent_id) = str_field(&agent, "id") else {
            continue;
        };
        let sources = remote
            .invoke(ApiRequest::get(["agents", agent_id, "sources"]))
            .await
            .context(format!("Listing sources of agent {agent_id}"))?;
        let attached = extract_list(sources, &["sources"])
            .iter()
            .any(|source| str_field(source, "id") == Some(source_id));
        if attached {
            using.push(project(&agent, AGENT_SUMMARY));
        }
    }

    Ok(CanonicalResult::ok(SourceOp::ListAgentsUsing.name())
        .with_message(format!("{} agents use source {source_id}", using.len()))
        .with("source_id", source_id)
        .with_items("agents", using))
}

fn source_list(op: &str, raw: JsonValue) -> CanonicalResult {
    let sources = project_all(&extract_list(raw, &["sources"]), SOURCE);
    CanonicalResult::ok(op)
        .with_message(format!("Found {} sources", sources.len()))
        .with_items("sources", sources)
}

fn source_result(op: &str, raw: &JsonValue) -> CanonicalResult {
    CanonicalResult::ok(op).with("source", project(raw, SOURCE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use letta_mcp_client::{Method, MockRemote, RequestBody};
    use pretty_assertions::assert_eq;

    async fn call(remote: &MockRemote, args: JsonValue) -> HubResult<CanonicalResult> {
        SourceManagerHub.call(remote, args).await
    }

    #[tokio::test]
    async fn test_upload_decodes_base64() {
        let remote = MockRemote::new().with_response(json!({"id": "job-1", "status": "created", "user_id": "u"}));
        let result = call(
            &remote,
            json!({
                "operation": "upload",
                "source_id": "src-1",
                "file_name": "notes.txt",
                "file_data": "aGVsbG8gd29ybGQ=",
                "content_type": "text/plain"
            }),
        )
        .await
        .unwrap();

        let request = remote.last_request().unwrap();
        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.path(), "/sources/src-1/upload");
        match request.body() {
            RequestBody::Multipart(part) => {
                assert_eq!(part.file_name, "notes.txt");
                assert_eq!(part.content_type, "text/plain");
                assert_eq!(part.data, b"hello world".to_vec());
            }
            other => panic!("expected multipart body, got {other:?}"),
        }
        assert_eq!(result.get("job"), Some(&json!({"id": "job-1", "status": "created"})));
    }

    #[tokio::test]
    async fn test_upload_default_content_type() {
        let remote = MockRemote::new();
        call(
            &remote,
            json!({"operation": "upload", "source_id": "s", "file_name": "a.bin", "file_data": "AAEC"}),
        )
        .await
        .unwrap();
        match remote.last_request().unwrap().body() {
            RequestBody::Multipart(part) => assert_eq!(part.content_type, DEFAULT_CONTENT_TYPE),
            other => panic!("expected multipart body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_base64() {
        let remote = MockRemote::new();
        let err = call(
            &remote,
            json!({"operation": "upload", "source_id": "s", "file_name": "a", "file_data": "%%%"}),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HubError::InvalidArguments(_)));
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_list_files_strips_content() {
        let files = json!([{"id": "f1", "file_name": "a.txt", "content": "long text", "file_size": 9}]);
        let remote = MockRemote::new()
            .with_response(files.clone())
            .with_response(json!({"files": files}));

        let stripped = call(&remote, json!({"operation": "list_files", "source_id": "s"}))
            .await
            .unwrap();
        assert_eq!(
            stripped.get("files"),
            Some(&json!([{"id": "f1", "filename": "a.txt", "size": 9}]))
        );

        let full = call(
            &remote,
            json!({"operation": "list_files", "source_id": "s", "include_content": true}),
        )
        .await
        .unwrap();
        assert_eq!(full.get("files").unwrap()[0]["content"], "long text");
    }

    #[tokio::test]
    async fn test_list_agents_using_checks_each_agent() {
        let remote = MockRemote::new()
            .with_response(json!([{"id": "a1", "name": "one"}, {"id": "a2", "name": "two"}]))
            .with_response(json!([{"id": "other"}]))
            .with_response(json!([{"id": "src-1"}]));

        let result = call(&remote, json!({"operation": "list_agents_using", "source_id": "src-1"}))
            .await
            .unwrap();

        assert_eq!(result.get("agents"), Some(&json!([{"id": "a2", "name": "two"}])));
        let paths: Vec<String> = remote.requests().iter().map(|r| r.path()).collect();
        assert_eq!(paths, vec!["/agents", "/agents/a1/sources", "/agents/a2/sources"]);
    }

    #[tokio::test]
    async fn test_missing_source_id() {
        let remote = MockRemote::new();
        let err = call(&remote, json!({"operation": "delete", "source_id": ""}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "source_id is required for delete operation");
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_body_skips_absent_fields() {
        let remote = MockRemote::new().with_response(json!({"id": "src-9", "name": "docs"}));
        let result = call(&remote, json!({"operation": "create", "name": "docs"})).await.unwrap();
        assert_eq!(remote.last_request().unwrap().json_body(), Some(&json!({"name": "docs"})));
        assert_eq!(result.get("source_id"), Some(&json!("src-9")));
    }
}
