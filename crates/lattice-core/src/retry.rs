//! Retry policy for flaky external calls (inventory reads, pricing fetches).

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::warn;

use crate::domain::errors::{ExternalError, SchedulerError};

/// Upper bound for a single backoff sleep.
pub const MAX_DELAY: Duration = Duration::from_secs(300);

/// Bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Total attempts, including the first one. At least 1.
    pub max_attempts: u32,

    /// Deadline for each individual attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(200),
            multiplier: 2.0,
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Calculate delay for the next retry based on attempt number.
    ///
    /// # Arguments
    /// * `attempts` - Number of attempts already made (1-indexed).
    ///
    /// delay = base_delay * multiplier^(attempts - 1)
    ///
    /// Example with base_delay=200ms, multiplier=2.0:
    /// - attempt 1 failed: 200ms
    /// - attempt 2 failed: 400ms
    /// - attempt 3 failed: 800ms
    ///
    /// Capped at [`MAX_DELAY`].
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = i32::try_from(attempts.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(delay_secs)
            .unwrap_or(MAX_DELAY)
            .min(MAX_DELAY)
    }
}

/// Every attempt failed (or the failure was not worth retrying).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed after {attempts} attempt(s): {source}")]
pub struct RetryExhausted {
    pub operation: String,
    pub attempts: u32,
    #[source]
    pub source: ExternalError,
}

impl From<RetryExhausted> for SchedulerError {
    fn from(e: RetryExhausted) -> Self {
        SchedulerError::TransientExternal {
            operation: e.operation,
            attempts: e.attempts,
            source: e.source,
        }
    }
}

/// Run `call` until it succeeds, the attempts run out, or it fails with a
/// non-transient error (`NotFound`).
///
/// Each attempt is bounded by `policy.attempt_timeout`; an elapsed attempt
/// counts as `ExternalError::Timeout`.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, RetryExhausted>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExternalError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match timeout(policy.attempt_timeout, call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => ExternalError::Timeout,
        };

        let transient = !matches!(error, ExternalError::NotFound(_));
        if !transient || attempt >= max_attempts {
            return Err(RetryExhausted {
                operation: operation.to_string(),
                attempts: attempt,
                source: error,
            });
        }

        let delay = policy.next_delay(attempt);
        warn!(
            operation,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "external call failed, retrying"
        );
        sleep(delay).await;
    }
}
