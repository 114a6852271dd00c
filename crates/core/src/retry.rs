//! Timeout and retry policy for calls to external services.
//!
//! Every embedder, index and generator call runs through a [`CallPolicy`]:
//! each attempt is bounded by a timeout (the in-flight future is dropped when
//! it expires) and transient failures are retried with exponential backoff.
//! Permanent failures (see [`AppError::is_transient`]) come back at once.

use std::future::Future;
use std::time::Duration;

use crate::config::ResilienceConfig;
use crate::error::{AppError, AppResult};

/// Whether an HTTP status means the service may accept the same request later.
///
/// Rate limits (429) and server errors (5xx) qualify; other client errors do not.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Timeout and retry settings for one kind of external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    /// Upper bound for a single attempt
    pub timeout: Duration,

    /// Extra attempts after the first failure
    pub retries: u32,

    /// Delay before the first retry; doubled for each further retry
    pub backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::from_config(&ResilienceConfig::default())
    }
}

impl CallPolicy {
    pub fn new(timeout: Duration, retries: u32, backoff: Duration) -> Self {
        Self {
            timeout,
            retries,
            backoff,
        }
    }

    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self::new(config.timeout(), config.retries, config.backoff())
    }

    /// Backoff before retry number `attempt` (1-based).
    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Run `call` under this policy.
    ///
    /// `call` is invoked once per attempt. The error of the last attempt is
    /// returned when all attempts fail or the error is not transient; an
    /// expired attempt yields [`AppError::Timeout`].
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let attempts = self.retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout {
                    operation: operation.to_string(),
                    after_ms: self.timeout.as_millis() as u64,
                }),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && e.is_transient() => {
                    let delay = self.backoff_for(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}), retrying in {}ms: {}",
                        operation,
                        attempt,
                        attempts,
                        delay.as_millis(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::debug!("{} failed after {} attempt(s): {}", operation, attempt, e);
                    return Err(e);
                }
            }
        }
    }
}
