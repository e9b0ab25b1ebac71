//! Retry policy for transient completion failures.

use crate::error::LlmError;

use std::future::Future;
use std::time::Duration;

/// Default number of extra attempts after the first call.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default delay before the first retry; doubles on each further retry.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

/// Bounded exponential backoff. Only errors where
/// [`LlmError::is_retriable`] holds are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// One attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
        }
    }

    /// Delay before the given attempt (0-based). The first attempt never waits.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u64.saturating_pow(attempt - 1);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    /// Run `operation` until it succeeds, fails with a non-retriable error,
    /// or the retry budget is spent. Returns the last error on failure.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut attempt = 0;
        loop {
            let delay = self.delay_for(attempt);
            if !delay.is_zero() {
                tracing::debug!(
                    client = %label,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after backoff"
                );
                tokio::time::sleep(delay).await;
            }

            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retriable() && attempt < self.max_retries => {
                    tracing::warn!(
                        client = %label,
                        attempt = attempt + 1,
                        %error,
                        "retriable completion error"
                    );
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
