//! Sentiment scoring of message text.
//!
//! [`SentimentScorer`] is a pure function over text. [`LexiconScorer`] is the
//! built-in rule-based implementation; [`score_parallel`] fans a batch out
//! across blocking worker threads.

mod lexicon;
mod pool;
mod scores;

pub use lexicon::LexiconScorer;
pub use pool::score_parallel;
pub use scores::{SentimentScorer, SentimentScores};
