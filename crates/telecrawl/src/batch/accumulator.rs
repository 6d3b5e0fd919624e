//! Batch accumulation, scoring and flushing.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::CrawlError;
use crate::frontier::Affiliation;
use crate::report::{ReportOutcome, ReportSummarizer};
use crate::sentiment::{score_parallel, SentimentScorer};

use super::record::MessageRecord;
use super::writer::BatchSink;

/// What a flush did.
#[derive(Debug)]
pub enum FlushOutcome {
    /// The batch was empty.
    Empty,
    /// The batch was written.
    Written {
        sequence: u64,
        records: usize,
        path: PathBuf,
    },
    /// Writing failed; the records are still in the master aggregate.
    WriteFailed {
        sequence: u64,
        records: usize,
        error: CrawlError,
    },
}

/// Running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Records handed to the accumulator.
    pub total_added: usize,
    /// Records moved out of the batch by flushes.
    pub flushed_records: usize,
    /// Records waiting in the current batch.
    pub buffered: usize,
    /// Non-empty flushes performed.
    pub flushes: u64,
    /// Flushes whose write failed.
    pub failed_writes: u64,
}

/// Buffers records and flushes them in numbered batches.
///
/// Owned by the crawler. Nothing is written on drop: callers must end with
/// [`BatchAccumulator::finalize`].
pub struct BatchAccumulator {
    sink: Box<dyn BatchSink>,
    scorer: Arc<dyn SentimentScorer>,
    threshold: usize,
    workers: usize,
    batch: Vec<MessageRecord>,
    master: Vec<MessageRecord>,
    sequence: u64,
    stats: BatchStats,
}

impl BatchAccumulator {
    /// Create an accumulator flushing every `threshold` records.
    #[must_use]
    pub fn new(
        sink: Box<dyn BatchSink>,
        scorer: Arc<dyn SentimentScorer>,
        threshold: usize,
        workers: usize,
    ) -> Self {
        Self {
            sink,
            scorer,
            threshold: threshold.max(1),
            workers: workers.max(1),
            batch: Vec::new(),
            master: Vec::new(),
            sequence: 0,
            stats: BatchStats::default(),
        }
    }

    /// Stamp and buffer `records`, flushing when the threshold is reached.
    pub async fn add_records(
        &mut self,
        records: Vec<MessageRecord>,
        channel_name: &str,
        affiliation: &Affiliation,
    ) -> Option<FlushOutcome> {
        if records.is_empty() {
            return None;
        }

        let added = records.len();
        self.batch.extend(records.into_iter().map(|mut record| {
            record.channel_name = channel_name.to_string();
            record.affiliation = affiliation.clone();
            record
        }));
        self.stats.total_added += added;

        tracing::debug!(
            channel = channel_name,
            added,
            buffered = self.batch.len(),
            total = self.stats.total_added,
            "Buffered records"
        );

        if self.batch.len() >= self.threshold {
            Some(self.flush().await)
        } else {
            None
        }
    }

    /// Score, persist and move the current batch into the master aggregate.
    ///
    /// Safe to call at any time; an empty batch is a no-op.
    pub async fn flush(&mut self) -> FlushOutcome {
        if self.batch.is_empty() {
            return FlushOutcome::Empty;
        }

        let mut batch = std::mem::take(&mut self.batch);
        self.score_unscored(&mut batch).await;

        self.sequence += 1;
        let sequence = self.sequence;
        let records = batch.len();
        self.stats.flushes += 1;

        let outcome = match self.sink.write_batch(sequence, &batch) {
            Ok(path) => {
                tracing::info!(sequence, records, path = %path.display(), "Batch saved");
                FlushOutcome::Written {
                    sequence,
                    records,
                    path,
                }
            }
            Err(source) => {
                let error = CrawlError::PersistenceWrite { sequence, source };
                tracing::error!(
                    sequence,
                    records,
                    error = %error,
                    "Batch write failed, keeping records in memory"
                );
                self.stats.failed_writes += 1;
                FlushOutcome::WriteFailed {
                    sequence,
                    records,
                    error,
                }
            }
        };

        self.stats.flushed_records += records;
        self.master.extend(batch);
        outcome
    }

    /// Flush what is left and summarize everything collected.
    pub async fn finalize(&mut self) -> ReportOutcome {
        let outcome = self.flush().await;
        if !matches!(outcome, FlushOutcome::Empty) {
            tracing::info!(?outcome, "Final batch flushed");
        }

        tracing::info!(total = self.master.len(), "Generating final report");
        let report = ReportSummarizer::summarize(&self.master);
        if matches!(report, ReportOutcome::NothingToReport) {
            tracing::warn!("No messages to generate report from");
        }
        report
    }

    async fn score_unscored(&self, batch: &mut [MessageRecord]) {
        let pending: Vec<usize> = batch
            .iter()
            .enumerate()
            .filter(|(_, r)| r.sentiment.is_none())
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            return;
        }

        let texts = pending.iter().map(|&i| batch[i].text.clone()).collect();
        let scores = score_parallel(Arc::clone(&self.scorer), texts, self.workers).await;

        for (index, scores) in pending.into_iter().zip(scores) {
            batch[index].sentiment = Some(scores);
        }
    }

    /// Running totals.
    #[must_use]
    pub fn stats(&self) -> BatchStats {
        BatchStats {
            buffered: self.batch.len(),
            ..self.stats
        }
    }

    /// Records flushed so far, scored.
    #[must_use]
    pub fn master(&self) -> &[MessageRecord] {
        &self.master
    }

    /// Records waiting for the next flush.
    #[must_use]
    pub fn buffered(&self) -> &[MessageRecord] {
        &self.batch
    }

    /// Sequence number of the last flush, `0` before the first.
    #[must_use]
    pub fn last_sequence(&self) -> u64 {
        self.sequence
    }
}
