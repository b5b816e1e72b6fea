//! Bounded retry loop for completion requests.

use std::future::Future;
use std::time::Duration;

use crate::{CompletionError, CompletionResult};

/// Upper bound on the delay between attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// How often, and how patiently, to retry a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each following one
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_backoff: Duration::from_millis(500),
        }
    }

    pub fn with_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_BACKOFF)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retries are used up. The last error is returned.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> CompletionResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CompletionResult<T>>,
    {
        let mut attempt = 0;
        loop {
            let err: CompletionError = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let remaining = self.max_retries - attempt;
            if remaining == 0 || !err.is_retryable() {
                return Err(err);
            }

            tracing::warn!(error = %err, remaining, "Completion request failed; retrying");
            tokio::time::sleep(self.backoff(attempt)).await;
            attempt += 1;
        }
    }
}

/// Run `op` with up to `max_retries` extra attempts and the default backoff.
pub async fn retry_async<T, F, Fut>(max_retries: u32, op: F) -> CompletionResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CompletionResult<T>>,
{
    RetryPolicy::new(max_retries).run(op).await
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(crate::DEFAULT_MAX_RETRIES)
    }
}
