use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// Maximum retry attempts after an initial request attempt.
pub const MAX_RETRIES: u32 = 3;
/// Base delay before the first retry.
pub const BASE_DELAY_MS: u64 = 250;
/// Upper bound on any single backoff delay.
pub const MAX_DELAY_MS: u64 = 2_000;

/// Capped exponential backoff for connection-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
            max_delay: Duration::from_millis(MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether zero-based `attempt` may be followed by another one.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Delay before the retry that follows zero-based `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(30);
        self.base_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay)
    }
}

fn retryable_status_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?i)loading.?model|unavailable|overloaded|connection.?refused")
            .expect("retry regex must compile")
    })
}

/// Status/body retry policy for a server that is up but not ready yet.
pub fn is_retryable_http_error(status: u16, error_text: &str) -> bool {
    matches!(status, 429 | 502 | 503 | 504) || retryable_status_regex().is_match(error_text)
}

/// Transport errors worth another attempt: refused or reset connections and
/// connect timeouts. The overall request ceiling is not retried.
pub fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    if error.is_connect() {
        return true;
    }
    if error.is_timeout() || error.is_builder() || error.is_redirect() {
        return false;
    }
    error.is_request()
}

/// Delay for `attempt` under the default policy.
pub fn retry_delay(attempt: u32) -> Duration {
    RetryPolicy::default().delay_for(attempt)
}
