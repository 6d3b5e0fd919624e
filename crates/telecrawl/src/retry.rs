//! Bounded exponential backoff around rate-limited remote calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::{CrawlError, Result};

/// Backoff policy for a single wrapped remote operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on every further retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Also retry transient remote errors, not only rate limits.
    pub retry_transient: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            retry_transient: false,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based) with the given jitter.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, jitter: Duration) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .saturating_mul(factor)
            .saturating_add(jitter)
            .min(self.max_delay)
    }

    fn is_retryable(&self, err: &CrawlError) -> bool {
        err.rate_limit_wait().is_some() || (self.retry_transient && err.is_transient())
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// the retry budget is spent.
    ///
    /// Exhausting the budget on a rate limit yields
    /// [`CrawlError::RetryExhausted`]; other errors are returned unchanged.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !self.is_retryable(&err) {
                return Err(err);
            }

            if attempt >= self.max_retries {
                tracing::warn!(attempts = attempt + 1, error = %err, "Retry budget exhausted");
                return Err(match err {
                    CrawlError::RateLimited { wait } => CrawlError::RetryExhausted {
                        attempts: attempt + 1,
                        last_wait: wait,
                    },
                    other => other,
                });
            }

            let delay = self.delay_for(attempt, jitter());
            tracing::warn!(
                attempt = attempt + 1,
                max_retries = self.max_retries,
                delay_secs = delay.as_secs_f64(),
                error = %err,
                "Retrying after backoff"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Uniform jitter in `[0, 1s)`.
fn jitter() -> Duration {
    Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..1.0))
}

/// Inner retry used while joining a channel.
///
/// Sleeps for the server-suggested wait (capped) instead of backing off
/// exponentially. Once the attempts are used up the last rate limit is
/// returned so an outer [`RetryPolicy`] can take over.
#[derive(Debug, Clone)]
pub struct JoinPolicy {
    /// Total join attempts.
    pub attempts: u32,
    /// Cap applied to server-suggested waits.
    pub wait_cap: Duration,
}

impl Default for JoinPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            wait_cap: Duration::from_secs(30),
        }
    }
}

impl JoinPolicy {
    /// Run a join `operation`, retrying only on rate limits.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(CrawlError::RateLimited { wait }) if attempt < self.attempts => {
                    let capped = wait.min(self.wait_cap);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.attempts,
                        wait_secs = capped.as_secs(),
                        "Rate limited while joining, waiting"
                    );
                    tokio::time::sleep(capped).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
