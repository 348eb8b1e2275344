//! reqwest-backed adapter for the Letta REST API.

use std::time::Duration;

use async_trait::async_trait;
use letta_mcp_core::{ApiError, Settings};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::request::{ApiRequest, Method, RequestBody};
use crate::RemoteCall;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// HTTP client for the Letta REST API.
///
/// Every request carries the bearer token and `Content-Type: application/json`
/// (multipart uploads set their own boundary content type). Exactly one HTTP
/// call is made per [`RemoteCall::invoke`]; failures are returned, never retried.
#[derive(Debug, Clone)]
pub struct LettaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LettaClient {
    /// Create a client from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, ApiError> {
        Self::with_timeout(settings.base_url(), settings.api_key(), settings.timeout())
    }

    /// Create a client with an explicit base URL, token and request timeout.
    ///
    /// `base_url` is used verbatim as the prefix of every request path.
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ApiError::connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build(&self, request: &ApiRequest) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = format!("{}{}", self.base_url, request.path());
        let method = match request.method() {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.api_key));

        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }

        builder = match request.body() {
            RequestBody::Empty => builder.header(CONTENT_TYPE, "application/json"),
            RequestBody::Json(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .json(body),
            RequestBody::Multipart(part) => {
                let file = reqwest::multipart::Part::bytes(part.data.clone())
                    .file_name(part.file_name.clone())
                    .mime_str(&part.content_type)
                    .map_err(|e| ApiError::decode(format!("Invalid content type: {e}")))?;
                builder.multipart(reqwest::multipart::Form::new().part("file", file))
            }
        };

        Ok(builder)
    }
}

#[async_trait]
impl RemoteCall for LettaClient {
    async fn invoke(&self, request: ApiRequest) -> Result<JsonValue, ApiError> {
        debug!(method = %request.method(), path = %request.path(), "Sending request");

        let response = self.build(&request)?.send().await.map_err(transport_error)?;
        let status = response.status();

        if !status.is_success() {
            let body = error_body(response.text().await);
            debug!(status = status.as_u16(), "Request failed");
            return Err(ApiError::from_status(status.as_u16(), body));
        }

        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |v| v.starts_with("text/event-stream"));

        let text = response.text().await.map_err(transport_error)?;
        if is_event_stream {
            return Ok(parse_event_stream(&text));
        }
        decode_body(&text)
    }
}

/// Map a reqwest failure onto the adapter error taxonomy.
fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else if err.is_decode() {
        ApiError::decode(err.to_string())
    } else if let Some(status) = err.status() {
        ApiError::from_status(status.as_u16(), err.to_string())
    } else {
        ApiError::connection(err.to_string())
    }
}

/// Decode a success body. Empty bodies (204 and friends) become `null`.
pub(crate) fn decode_body(text: &str) -> Result<JsonValue, ApiError> {
    if text.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    serde_json::from_str(text).map_err(|e| ApiError::decode(e.to_string()))
}

/// Body of a failed response. An unreadable body is logged and reported empty.
fn error_body<E: std::fmt::Display>(read: Result<String, E>) -> String {
    read.unwrap_or_else(|e| {
        debug!(error = %e, "Failed to read error response body");
        String::new()
    })
}

/// Collect the JSON payloads of a server-sent event stream into an array.
///
/// Non-JSON `data:` lines are kept as strings; the `[DONE]` sentinel is dropped.
pub(crate) fn parse_event_stream(text: &str) -> JsonValue {
    let events = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|data| !data.is_empty() && *data != "[DONE]")
        .map(|data| {
            serde_json::from_str(data).unwrap_or_else(|_| JsonValue::String(data.to_string()))
        })
        .collect();
    JsonValue::Array(events)
}
