//! Recording adapter for tests.
//!
//! [`MockRemote`] answers calls from a queue of pre-configured responses and
//! records every request it receives, so tests can assert both on what was
//! sent and on how many calls were made.
//!
//! ```rust
//! use letta_mcp_client::{ApiRequest, MockRemote, RemoteCall};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let remote = MockRemote::new().with_response(json!([{"id": "job-1"}]));
//! let jobs = remote.invoke(ApiRequest::get(["jobs"])).await.unwrap();
//!
//! assert_eq!(jobs[0]["id"], "job-1");
//! assert_eq!(remote.call_count(), 1);
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use letta_mcp_core::ApiError;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use crate::request::ApiRequest;
use crate::RemoteCall;

/// A scripted [`RemoteCall`] implementation.
///
/// Responses are consumed in order. Once the queue is empty every further
/// call answers `null`.
#[derive(Debug, Clone, Default)]
pub struct MockRemote {
    responses: Arc<Mutex<VecDeque<Result<JsonValue, ApiError>>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl MockRemote {
    /// Create a mock with an empty response queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    #[must_use]
    pub fn with_response(self, response: JsonValue) -> Self {
        self.responses.lock().push_back(Ok(response));
        self
    }

    /// Queue a failure.
    #[must_use]
    pub fn with_error(self, error: ApiError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Requests received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// Number of calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// The most recent request, if any.
    #[must_use]
    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl RemoteCall for MockRemote {
    async fn invoke(&self, request: ApiRequest) -> Result<JsonValue, ApiError> {
        self.requests.lock().push(request);
        self.responses.lock().pop_front().unwrap_or(Ok(JsonValue::Null))
    }
}
