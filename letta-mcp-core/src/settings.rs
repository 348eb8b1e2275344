//! Process configuration.
//!
//! Settings are read once at startup from the environment and are immutable
//! afterwards.

use std::time::Duration;

use url::Url;

use crate::errors::{HubError, HubResult};

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 3001;

/// Default upstream request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport the MCP server listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Newline-delimited JSON-RPC over stdin/stdout.
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST.
    Http,
}

impl std::str::FromStr for TransportKind {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            other => Err(HubError::configuration(format!(
                "TRANSPORT must be 'stdio' or 'http', got '{other}'"
            ))),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Runtime settings.
#[derive(Clone)]
pub struct Settings {
    base_url: String,
    api_key: String,
    transport: TransportKind,
    port: u16,
    timeout: Duration,
    log_format: LogFormat,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("transport", &self.transport)
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Settings {
    /// Create settings for the given platform URL and token.
    ///
    /// The URL loses any trailing slash and gains a `/v1` suffix unless it
    /// already ends with one.
    pub fn new(base_url: impl AsRef<str>, api_key: impl Into<String>) -> HubResult<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url.as_ref())?,
            api_key: api_key.into(),
            transport: TransportKind::default(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            log_format: LogFormat::default(),
        })
    }

    /// Load settings from process environment variables.
    pub fn from_env() -> HubResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> HubResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = var("LETTA_BASE_URL")
            .ok_or_else(|| HubError::configuration("LETTA_BASE_URL not set"))?;
        let api_key = var("LETTA_PASSWORD")
            .or_else(|| var("LETTA_API_KEY"))
            .ok_or_else(|| HubError::configuration("LETTA_PASSWORD not set"))?;

        let mut settings = Self::new(base_url, api_key)?;

        if let Some(transport) = var("TRANSPORT") {
            settings.transport = transport.parse()?;
        }
        if let Some(port) = var("PORT") {
            settings.port = port
                .trim()
                .parse()
                .map_err(|_| HubError::configuration(format!("PORT is not a valid port: {port}")))?;
        }
        if let Some(secs) = var("LETTA_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                HubError::configuration(format!("LETTA_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            settings.timeout = Duration::from_secs(secs);
        }
        if let Some(format) = var("LOG_FORMAT") {
            settings.log_format = match format.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Text,
            };
        }

        Ok(settings)
    }

    /// Set the transport.
    #[must_use]
    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Set the HTTP port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the upstream request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the log format.
    #[must_use]
    pub fn with_log_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }

    /// API base URL, including the version prefix.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Bearer token.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Selected transport.
    #[must_use]
    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    /// HTTP listen port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Upstream request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

fn normalize_base_url(raw: &str) -> HubResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed)
        .map_err(|e| HubError::configuration(format!("LETTA_BASE_URL is invalid: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(HubError::configuration(format!(
            "LETTA_BASE_URL must use http or https, got '{}'",
            parsed.scheme()
        )));
    }
    if trimmed.ends_with("/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/v1"))
    }
}
