//! Telegram channel crawler with security sentiment scoring.
//!
//! This crate provides:
//! - Channel link extraction and normalization
//! - A depth-bounded discovery crawl over linked channels
//! - Rate-limit aware retry around remote calls
//! - Batched CSV export with a guaranteed final flush
//! - Lexicon-based sentiment scoring and an HTML/console report

pub mod batch;
pub mod config;
pub mod crawler;
pub mod error;
pub mod frontier;
pub mod links;
pub mod report;
pub mod retry;
pub mod sentiment;
pub mod telegram;

// Re-export main types
pub use batch::{BatchAccumulator, CsvBatchWriter, FlushOutcome, MessageRecord};
pub use config::CrawlerConfig;
pub use crawler::{CrawlOrchestrator, CrawlSettings, CrawlStats, CrawlSummary};
pub use error::{CrawlError, Result};
pub use frontier::{Affiliation, ChannelState, FrontierTracker};
pub use links::{extract_references, normalize, ChannelId, ChannelKind};
pub use report::{Category, ReportOutcome, ReportSummarizer, SentimentReport};
pub use retry::{JoinPolicy, RetryPolicy};
pub use sentiment::{LexiconScorer, SentimentScorer, SentimentScores};
pub use telegram::{Entity, MessagingClient, RemoteMessage, WebPreviewClient};
