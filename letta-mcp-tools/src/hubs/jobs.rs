//! `letta_job_monitor`: background job inspection.

use async_trait::async_trait;
use letta_mcp_client::{ApiRequest, RemoteCall};
use letta_mcp_core::args::required;
use letta_mcp_core::normalize::{extract_list, project, project_all};
use letta_mcp_core::{CanonicalResult, HubResult, UpstreamContext};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::definition::ToolDefinition;
use crate::entities::JOB;
use crate::hub::{prepare, Hub};
use crate::operation::OperationSet;
use crate::schema::SchemaBuilder;

crate::operations! {
    /// Job monitor operations.
    pub enum JobOp for "letta_job_monitor" {
        /// List jobs, optionally for one source.
        List = "list" => [],
        /// Fetch one job.
        Get = "get" => ["job_id"],
        /// Cancel a running job.
        Cancel = "cancel" => ["job_id"],
        /// List jobs that have not finished.
        ListActive = "list_active" => [],
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JobRequest {
    job_id: Option<String>,
    source_id: Option<String>,
    limit: Option<u32>,
}

/// Job monitoring hub.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobMonitorHub;

#[async_trait]
impl Hub for JobMonitorHub {
    fn name(&self) -> &'static str {
        JobOp::TOOL
    }

    fn definition(&self) -> Result<ToolDefinition, serde_json::Error> {
        let schema = SchemaBuilder::new()
            .enum_values("operation", "Operation to perform", &JobOp::names(), true)
            .string("job_id", "Job identifier (get, cancel)", false)
            .string("source_id", "Only list jobs for this source (list)", false)
            .integer("limit", "Maximum number of jobs to return (list)", false)
            .build()?;
        Ok(ToolDefinition::new(
            self.name(),
            "Monitor background jobs such as file processing: list, get, cancel, list_active",
            schema,
        ))
    }

    async fn call(&self, remote: &dyn RemoteCall, args: JsonValue) -> HubResult<CanonicalResult> {
        let (op, req): (JobOp, JobRequest) = prepare(args)?;
        match op {
            JobOp::List => {
                let request = ApiRequest::get(["jobs"])
                    .query_opt("source_id", req.source_id.as_deref())
                    .query_opt("limit", req.limit);
                let raw = remote.invoke(request).await.context("Listing jobs")?;
                Ok(job_list(op, raw))
            }
            JobOp::ListActive => {
                let raw = remote
                    .invoke(ApiRequest::get(["jobs", "active"]))
                    .await
                    .context("Listing active jobs")?;
                Ok(job_list(op, raw))
            }
            JobOp::Get => {
                let job_id = required(&req.job_id, "job_id", op.name())?;
                let raw = remote
                    .invoke(ApiRequest::get(["jobs", job_id]))
                    .await
                    .context(format!("Getting job {job_id}"))?;
                Ok(CanonicalResult::ok(op.name())
                    .with_message(format!("Job {job_id} retrieved"))
                    .with("job", project(&raw, JOB)))
            }
            JobOp::Cancel => {
                let job_id = required(&req.job_id, "job_id", op.name())?;
                let raw = remote
                    .invoke(ApiRequest::patch(["jobs", job_id, "cancel"]))
                    .await
                    .context(format!("Cancelling job {job_id}"))?;
                Ok(CanonicalResult::ok(op.name())
                    .with_message(format!("Job {job_id} cancelled"))
                    .with("job", project(&raw, JOB)))
            }
        }
    }
}

fn job_list(op: JobOp, raw: JsonValue) -> CanonicalResult {
    let jobs = project_all(&extract_list(raw, &["jobs"]), JOB);
    CanonicalResult::ok(op.name())
        .with_message(format!("Found {} jobs", jobs.len()))
        .with_items("jobs", jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use letta_mcp_client::{Method, MockRemote};
    use letta_mcp_core::HubError;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!({"operation": "get"}))]
    #[case(json!({"operation": "get", "job_id": null}))]
    #[case(json!({"operation": "cancel", "job_id": ""}))]
    #[tokio::test]
    async fn test_missing_job_id_makes_no_calls(#[case] args: JsonValue) {
        let remote = MockRemote::new();
        let err = JobMonitorHub.call(&remote, args).await.unwrap_err();
        assert!(matches!(err, HubError::MissingArgument { ref field, .. } if field == "job_id"));
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_list_accepts_both_shapes() {
        let items = json!([{"id": "job-1", "status": "running"}, {"id": "job-2", "status": "completed"}]);
        let bare = MockRemote::new().with_response(items.clone());
        let wrapped = MockRemote::new().with_response(json!({"jobs": items}));

        let a = JobMonitorHub.call(&bare, json!({"operation": "list"})).await.unwrap();
        let b = JobMonitorHub.call(&wrapped, json!({"operation": "list"})).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.get("count"), Some(&json!(2)));
        assert_eq!(a.get("jobs").unwrap()[0]["id"], "job-1");
        assert_eq!(a.get("jobs").unwrap()[1]["id"], "job-2");
    }

    #[tokio::test]
    async fn test_list_unexpected_shape_is_empty() {
        let remote = MockRemote::new().with_response(json!({"unexpected": true}));
        let result = JobMonitorHub.call(&remote, json!({"operation": "list"})).await.unwrap();
        assert_eq!(result.get("jobs"), Some(&json!([])));
        assert_eq!(result.get("count"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn test_list_passes_filters() {
        let remote = MockRemote::new().with_response(json!([]));
        JobMonitorHub
            .call(&remote, json!({"operation": "list", "source_id": "src-1", "limit": 5}))
            .await
            .unwrap();

        let request = remote.last_request().unwrap();
        assert_eq!(request.path(), "/jobs");
        assert_eq!(
            request.query_pairs(),
            &[
                ("source_id".to_string(), "src-1".to_string()),
                ("limit".to_string(), "5".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_get_is_idempotent() {
        let job = json!({"id": "job-1", "status": "completed", "created_at": "2024-01-01T00:00:00Z"});
        let remote = MockRemote::new()
            .with_response(job.clone())
            .with_response(job);
        let args = json!({"operation": "get", "job_id": "job-1"});

        let first = JobMonitorHub.call(&remote, args.clone()).await.unwrap();
        let second = JobMonitorHub.call(&remote, args).await.unwrap();
        assert_eq!(first.to_json_string().unwrap(), second.to_json_string().unwrap());
    }

    #[tokio::test]
    async fn test_cancel_uses_patch() {
        let remote = MockRemote::new().with_response(json!({"id": "job/1", "status": "cancelled"}));
        let result = JobMonitorHub
            .call(&remote, json!({"operation": "cancel", "job_id": "job/1"}))
            .await
            .unwrap();

        let request = remote.last_request().unwrap();
        assert_eq!(request.method(), Method::Patch);
        assert_eq!(request.path(), "/jobs/job%2F1/cancel");
        assert_eq!(result.get("job").unwrap()["status"], "cancelled");
    }

    #[tokio::test]
    async fn test_upstream_error_has_context() {
        let remote = MockRemote::new().with_error(letta_mcp_core::ApiError::from_status(404, "gone"));
        let err = JobMonitorHub
            .call(&remote, json!({"operation": "get", "job_id": "job-9"}))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Getting job job-9: "));
        assert_eq!(err.api_error().and_then(|e| e.status()), Some(404));
    }

    #[test]
    fn test_definition_lists_operations() {
        let def = JobMonitorHub.definition().unwrap();
        assert_eq!(def.operations(), vec!["list", "get", "cancel", "list_active"]);
    }
}
