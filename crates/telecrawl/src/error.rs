//! Error types for the crawl pipeline.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while crawling, retrying, and persisting batches.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The platform asked us to slow down.
    #[error("Rate limited, retry after {}s", wait.as_secs())]
    RateLimited {
        /// Server-suggested wait before the next attempt.
        wait: Duration,
    },

    /// The entity is private, unknown, or cannot be read anonymously.
    #[error("Entity unavailable: {0}")]
    EntityUnavailable(String),

    /// Any other failure of a remote call (network, unexpected response).
    #[error("Remote call failed: {0}")]
    Transient(String),

    /// The retry wrapper gave up on a rate-limited operation.
    #[error("Retries exhausted after {attempts} attempts (last suggested wait {}s)", last_wait.as_secs())]
    RetryExhausted {
        /// Number of attempts made, including the first.
        attempts: u32,
        /// The wait suggested by the last rate-limit signal.
        last_wait: Duration,
    },

    /// Writing a flushed batch to durable storage failed.
    #[error("Failed to persist batch {sequence}: {source}")]
    PersistenceWrite {
        /// Sequence number of the batch that failed to write.
        sequence: u64,
        #[source]
        source: std::io::Error,
    },

    /// The crawl was interrupted before the operation finished.
    #[error("Crawl cancelled")]
    Cancelled,
}

impl CrawlError {
    /// The suggested wait, if this is a rate-limit signal.
    #[must_use]
    pub fn rate_limit_wait(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { wait } => Some(*wait),
            _ => None,
        }
    }

    /// Whether the error is a transient remote failure.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<reqwest::Error> for CrawlError {
    fn from(err: reqwest::Error) -> Self {
        CrawlError::Transient(err.to_string())
    }
}

/// Result alias for crawl operations.
pub type Result<T> = std::result::Result<T, CrawlError>;
