//! Depth-bounded channel crawl.
//!
//! The crawler seeds the frontier, then runs up to `channel_depth` passes.
//! Each pass works through the channels that were pending when it started:
//! join, scrape recent messages, queue the channels they reference, hand the
//! messages to the accumulator. Every picked channel ends up processed,
//! whatever happened to it. Cancellation stops the traversal at the next
//! await point; the accumulator is finalized on every exit path.
//!
//! No deadline is put on individual remote calls. A [`MessagingClient`] call
//! that never completes stalls the crawl until the token is cancelled, which
//! abandons the call and still finalizes. [`WebPreviewClient`] bounds each
//! request with its [`PreviewConfig::timeout`] (30s by default), so with the
//! web transport a stuck request surfaces as a transient failure instead.
//!
//! [`WebPreviewClient`]: crate::telegram::WebPreviewClient
//! [`PreviewConfig::timeout`]: crate::telegram::PreviewConfig::timeout

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::batch::{BatchAccumulator, BatchStats, MessageRecord};
use crate::error::{CrawlError, Result};
use crate::frontier::{Affiliation, ChannelState, FrontierCounts, FrontierTracker};
use crate::links::{extract_references, ChannelId, ChannelKind};
use crate::report::ReportOutcome;
use crate::retry::{JoinPolicy, RetryPolicy};
use crate::telegram::{Entity, MessagingClient};

/// Crawl limits and pacing.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Most recent messages read per channel.
    pub message_depth: usize,
    /// Maximum traversal passes.
    pub channel_depth: usize,
    /// Pause after each channel.
    pub channel_delay: Duration,
    /// Pause between passes.
    pub pass_delay: Duration,
    /// Backoff around resolve and join.
    pub retry: RetryPolicy,
    /// Inner retry of the join call. Its wait cap also bounds the pause
    /// after a rate limit while reading messages.
    pub join: JoinPolicy,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            message_depth: 40,
            channel_depth: 2,
            channel_delay: Duration::from_secs(1),
            pass_delay: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            join: JoinPolicy::default(),
        }
    }
}

/// Counters for one crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Passes started.
    pub passes: usize,
    /// Channels picked from the frontier.
    pub channels_attempted: usize,
    /// Channels whose messages were read.
    pub channels_scraped: usize,
    /// Channels skipped after a failed resolve or join.
    pub channels_failed: usize,
    /// Text messages collected.
    pub messages_collected: usize,
    /// Channel references seen in messages.
    pub references_found: usize,
    /// References that were new channels.
    pub channels_discovered: usize,
}

impl fmt::Display for CrawlStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passes, {} channels ({} scraped, {} failed), {} messages, {} references ({} new channels)",
            self.passes,
            self.channels_attempted,
            self.channels_scraped,
            self.channels_failed,
            self.messages_collected,
            self.references_found,
            self.channels_discovered
        )
    }
}

/// Everything a finished crawl produced.
#[derive(Debug)]
pub struct CrawlSummary {
    pub stats: CrawlStats,
    /// Frontier state counts at the end.
    pub frontier: FrontierCounts,
    /// Processed channels, sorted.
    pub processed: Vec<ChannelId>,
    pub batches: BatchStats,
    pub report: ReportOutcome,
    /// Whether the crawl was interrupted.
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// Messages and references read from one channel.
struct Scrape {
    records: Vec<MessageRecord>,
    references: Vec<String>,
    cancelled: bool,
}

/// Drives the crawl and owns its state.
pub struct CrawlOrchestrator {
    client: Arc<dyn MessagingClient>,
    settings: CrawlSettings,
    frontier: FrontierTracker,
    accumulator: BatchAccumulator,
    cancel: CancellationToken,
    stats: CrawlStats,
}

impl CrawlOrchestrator {
    /// Create a crawler. Cancelling `cancel` ends the crawl early.
    #[must_use]
    pub fn new(
        client: Arc<dyn MessagingClient>,
        accumulator: BatchAccumulator,
        settings: CrawlSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            settings,
            frontier: FrontierTracker::new(),
            accumulator,
            cancel,
            stats: CrawlStats::default(),
        }
    }

    /// Crawl from `seeds` and finalize the accumulator.
    pub async fn run(mut self, seeds: &[String]) -> CrawlSummary {
        let started = Instant::now();

        self.seed(seeds);

        let cancelled = match self.traverse().await {
            Ok(()) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Crawl interrupted, saving collected messages");
                true
            }
        };

        let report = self.accumulator.finalize().await;
        let elapsed = started.elapsed();

        tracing::info!(
            stats = %self.stats,
            elapsed_secs = elapsed.as_secs_f64(),
            cancelled,
            "Crawl finished"
        );

        CrawlSummary {
            stats: self.stats,
            frontier: self.frontier.counts(),
            processed: self
                .frontier
                .channels_in(ChannelState::Processed)
                .into_iter()
                .cloned()
                .collect(),
            batches: self.accumulator.stats(),
            report,
            cancelled,
            elapsed,
        }
    }

    fn seed(&mut self, seeds: &[String]) {
        for raw in seeds {
            if self.frontier.add(raw, None).is_none() {
                tracing::warn!(
                    reference = %raw,
                    "Ignoring seed that is not a channel link or is a duplicate"
                );
            }
        }
        tracing::info!(seeds = self.frontier.pending_count(), "Frontier seeded");
    }

    /// Run the passes. Only returns an error when cancelled.
    async fn traverse(&mut self) -> Result<()> {
        for pass in 1..=self.settings.channel_depth {
            if self.cancel.is_cancelled() {
                return Err(CrawlError::Cancelled);
            }

            let pending = self.frontier.pending_count();
            if pending == 0 {
                break;
            }

            self.stats.passes = pass;
            tracing::info!(
                pass,
                depth = self.settings.channel_depth,
                status = %self.frontier.counts(),
                "Starting pass"
            );

            // Channels discovered during this pass wait for the next one
            for _ in 0..pending {
                let Some(id) = self.frontier.pop_next() else {
                    break;
                };

                let result = self.process_channel(&id).await;
                self.frontier.mark_processed(&id);
                result?;

                self.pause(self.settings.channel_delay).await?;
            }

            if pass < self.settings.channel_depth && self.frontier.has_pending() {
                self.pause(self.settings.pass_delay).await?;
            }
        }

        tracing::info!(status = %self.frontier.counts(), "Traversal complete");
        Ok(())
    }

    /// Join and scrape one channel. Failures are logged and swallowed;
    /// only cancellation is returned.
    async fn process_channel(&mut self, id: &ChannelId) -> Result<()> {
        self.stats.channels_attempted += 1;
        tracing::info!(channel = %id, "Processing channel");

        let entity = match self.join_channel(id).await {
            Ok(entity) => entity,
            Err(CrawlError::Cancelled) => return Err(CrawlError::Cancelled),
            Err(e) => {
                tracing::warn!(channel = %id, error = %e, "Skipping channel");
                self.stats.channels_failed += 1;
                return Ok(());
            }
        };
        self.frontier.mark_joined(id);

        let scrape = self.scrape(id, &entity).await;
        self.stats.channels_scraped += 1;
        self.stats.messages_collected += scrape.records.len();
        self.stats.references_found += scrape.references.len();

        for raw in &scrape.references {
            if self.frontier.add(raw, Some(id)).is_some() {
                self.stats.channels_discovered += 1;
            }
        }

        let affiliation = self
            .frontier
            .affiliation_of(id)
            .cloned()
            .unwrap_or(Affiliation::Initial);
        let channel_name = entity.display_name();

        tracing::info!(
            channel = %channel_name,
            messages = scrape.records.len(),
            references = scrape.references.len(),
            "Channel scraped"
        );

        self.accumulator
            .add_records(scrape.records, &channel_name, &affiliation)
            .await;

        if scrape.cancelled {
            return Err(CrawlError::Cancelled);
        }
        Ok(())
    }

    /// Resolve and join under the retry policies.
    async fn join_channel(&self, id: &ChannelId) -> Result<Entity> {
        let client: &dyn MessagingClient = self.client.as_ref();
        let join_policy = &self.settings.join;

        let operation = self.settings.retry.run(|| async move {
            let entity = client.resolve(id).await?;

            match &entity {
                Entity::User { .. } => {
                    tracing::debug!(channel = %id, "User entity, no join needed");
                }
                _ if entity.username().is_some() || id.kind() == ChannelKind::Invite => {
                    join_policy.run(|| client.join(&entity)).await?;
                    tracing::info!(channel = %id, entity = %entity.display_name(), "Joined");
                }
                _ => {
                    return Err(CrawlError::EntityUnavailable(format!(
                        "{id} has neither a public username nor an invite"
                    )));
                }
            }

            Ok::<_, CrawlError>(entity)
        });

        self.cancellable(operation).await
    }

    /// Read up to `message_depth` recent messages.
    ///
    /// A rate limit pauses (capped) and ends the read; other errors end it
    /// immediately. Messages read so far are always kept.
    async fn scrape(&self, id: &ChannelId, entity: &Entity) -> Scrape {
        let mut scrape = Scrape {
            records: Vec::new(),
            references: Vec::new(),
            cancelled: false,
        };
        let mut messages = self
            .client
            .recent_messages(entity, self.settings.message_depth);

        loop {
            let next = tokio::select! {
                () = self.cancel.cancelled() => {
                    scrape.cancelled = true;
                    break;
                }
                next = messages.next() => next,
            };

            match next {
                None => break,
                Some(Ok(message)) => {
                    let Some(record) = MessageRecord::from_remote(message) else {
                        continue;
                    };
                    scrape.references.extend(extract_references(&record.text));
                    scrape.records.push(record);
                }
                Some(Err(CrawlError::RateLimited { wait })) => {
                    let wait = wait.min(self.settings.join.wait_cap);
                    tracing::warn!(
                        channel = %id,
                        wait_secs = wait.as_secs(),
                        collected = scrape.records.len(),
                        "Rate limited while reading messages, keeping what was read"
                    );
                    scrape.cancelled = self.pause(wait).await.is_err();
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!(channel = %id, error = %e, "Failed reading messages");
                    break;
                }
            }
        }

        scrape
    }

    /// Race `operation` against cancellation.
    async fn cancellable<T>(&self, operation: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            () = self.cancel.cancelled() => Err(CrawlError::Cancelled),
            result = operation => result,
        }
    }

    /// Sleep unless cancelled first.
    async fn pause(&self, duration: Duration) -> Result<()> {
        if duration.is_zero() {
            return if self.cancel.is_cancelled() {
                Err(CrawlError::Cancelled)
            } else {
                Ok(())
            };
        }
        self.cancellable(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = CrawlSettings::default();
        assert_eq!(settings.message_depth, 40);
        assert_eq!(settings.channel_depth, 2);
        assert_eq!(settings.channel_delay, Duration::from_secs(1));
        assert_eq!(settings.pass_delay, Duration::from_secs(5));
        assert_eq!(settings.retry.max_retries, 5);
        assert_eq!(settings.join.attempts, 3);
    }

    #[test]
    fn test_stats_display() {
        let stats = CrawlStats {
            passes: 2,
            channels_attempted: 5,
            channels_scraped: 4,
            channels_failed: 1,
            messages_collected: 120,
            references_found: 9,
            channels_discovered: 3,
        };
        assert_eq!(
            stats.to_string(),
            "2 passes, 5 channels (4 scraped, 1 failed), 120 messages, 9 references (3 new channels)"
        );
    }
}
