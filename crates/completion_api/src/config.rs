use std::collections::BTreeMap;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::url::{base_url_for, DEFAULT_HOST, DEFAULT_PORT};

/// Ceiling for one whole completion call, headers through final frame.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
/// Bound on establishing the TCP connection; exceeding it counts as a retryable failure.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport configuration for completion requests.
#[derive(Debug, Clone)]
pub struct CompletionApiConfig {
    /// Server base URL, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Overall request timeout.
    pub timeout: Option<Duration>,
    /// Connection establishment timeout.
    pub connect_timeout: Option<Duration>,
    /// Backoff policy for connection-level failures.
    pub retry: RetryPolicy,
}

impl Default for CompletionApiConfig {
    fn default() -> Self {
        Self {
            base_url: base_url_for(DEFAULT_HOST, DEFAULT_PORT),
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: Some(DEFAULT_TIMEOUT),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            retry: RetryPolicy::default(),
        }
    }
}

impl CompletionApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Config targeting `http://{host}:{port}`.
    pub fn for_host(host: &str, port: u16) -> Self {
        Self::new(base_url_for(host, port))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }
}
