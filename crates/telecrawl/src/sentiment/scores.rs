//! Score types and the scorer trait.

use serde::{Deserialize, Serialize};

/// Polarity scores for one text.
///
/// `neg`, `neu` and `pos` are proportions in `[0, 1]`; `compound` is the
/// normalized overall polarity in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentScores {
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    pub compound: f64,
}

impl SentimentScores {
    /// Whether the negative share dominates enough to flag the text.
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        self.neg > 0.5
    }
}

/// Scores free text. Implementations must be pure and thread-safe.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> SentimentScores;
}
