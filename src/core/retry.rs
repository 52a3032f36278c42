//! Retry policy for remote calls.
//!
//! A [`RetryPolicy`] is a plain value applied at each remote-call site
//! (search, generation). It wraps only the remote call, never cache
//! lookups or response parsing, and sleeps between attempts without
//! holding any lock.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Default number of attempts (including the first call).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay after the first failed attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);
/// Default ceiling on any single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Decides whether an error is worth another attempt.
///
/// Remote failures are transient unless they stem from configuration
/// (missing keys, unknown providers) or invalid input.
pub trait Retryable {
    /// Returns `true` if the operation should be attempted again.
    fn is_retryable(&self) -> bool {
        true
    }
}

/// Exponential backoff policy: `base_delay * multiplier^(n-1)`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first call. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: u32,
}

/// Final failure of a retried operation.
#[derive(Debug)]
pub struct RetryFailure<E> {
    /// Attempts actually made.
    pub attempts: u32,
    /// Error from the last attempt.
    pub error: E,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }
}

impl RetryPolicy {
    /// Creates a doubling policy.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            multiplier: 2,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay to wait after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is spent.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, op: F) -> Result<T, RetryFailure<E>>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_if(operation, E::is_retryable, op).await
    }

    /// Like [`RetryPolicy::run`], with an explicit retryable predicate.
    pub async fn run_if<T, E, P, F, Fut>(
        &self,
        operation: &str,
        is_retryable: P,
        mut op: F,
    ) -> Result<T, RetryFailure<E>>
    where
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(operation, attempt, max_attempts, "attempting remote call");

            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "remote call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) if attempt < max_attempts && is_retryable(&error) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "remote call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    warn!(operation, attempt, error = %error, "remote call failed, giving up");
                    return Err(RetryFailure {
                        attempts: attempt,
                        error,
                    });
                }
            }
        }
    }
}
