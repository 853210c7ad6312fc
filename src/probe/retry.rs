//! Bounded retry with linear backoff
//!
//! [`RetryingTransport`] wraps any [`Transport`] and re-issues a failed request
//! until the attempt budget is spent. Every failure is retried, whatever its
//! kind. The wait before attempt `i + 1` is `backoff_unit * i`.

use crate::config::ProbeConfig;
use crate::probe::context::{Diagnostic, Diagnostics};
use crate::probe::fetcher::{FetchError, FetchOptions, HttpResponse, Transport};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Default attempts per request, including the first one
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Default linear backoff unit (3 seconds)
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_millis(3000);

/// Attempt budget and backoff unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy; at least one attempt is always made
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.backoff_ms))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff_unit(&self) -> Duration {
        self.backoff_unit
    }

    /// Wait after failed attempt `attempt` (1-indexed)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }
}

/// [`Transport`] that retries its inner transport
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            inner,
            policy,
            diagnostics,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryingTransport<T> {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<HttpResponse, FetchError> {
        let mut attempt = 1;
        loop {
            match self.inner.fetch(url, options).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt >= self.policy.max_attempts => {
                    tracing::debug!(url, attempt, error = %e, "attempts exhausted");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.policy.delay_after(attempt);
                    self.diagnostics.record(Diagnostic::Retry {
                        url: url.to_string(),
                        attempt,
                        delay,
                        error: e.to_string(),
                    });
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
