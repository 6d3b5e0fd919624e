//! Aggregation of scored records into a sentiment report.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::batch::MessageRecord;

/// Number of records in each top list.
pub const TOP_N: usize = 5;

/// Per-message band over the compound score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    #[serde(rename = "High Alert")]
    HighAlert,
    #[serde(rename = "Potential Threat")]
    PotentialThreat,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Potentially Positive")]
    PotentiallyPositive,
    #[serde(rename = "Very Positive")]
    VeryPositive,
}

impl Category {
    /// All categories, most severe first.
    #[must_use]
    pub fn all() -> &'static [Category] {
        &[
            Category::HighAlert,
            Category::PotentialThreat,
            Category::Neutral,
            Category::PotentiallyPositive,
            Category::VeryPositive,
        ]
    }

    /// Band a compound score.
    #[must_use]
    pub fn from_compound(compound: f64) -> Self {
        if compound <= -0.5 {
            Category::HighAlert
        } else if compound <= -0.1 {
            Category::PotentialThreat
        } else if compound < 0.1 {
            Category::Neutral
        } else if compound < 0.5 {
            Category::PotentiallyPositive
        } else {
            Category::VeryPositive
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Category::HighAlert => "High Alert",
            Category::PotentialThreat => "Potential Threat",
            Category::Neutral => "Neutral",
            Category::PotentiallyPositive => "Potentially Positive",
            Category::VeryPositive => "Very Positive",
        }
    }

    /// What the band means for the reader.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Category::HighAlert => "Severe Threats",
            Category::PotentialThreat => "Potential Threats",
            Category::Neutral => "Neutral Messages",
            Category::PotentiallyPositive => "Potentially Positive",
            Category::VeryPositive => "Strong Security Indicators",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdict over the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpretation {
    Critical,
    Concerning,
    Neutral,
    Positive,
    VeryPositive,
}

impl Interpretation {
    /// Band an overall score (mean compound × 100).
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score <= -50.0 {
            Interpretation::Critical
        } else if score <= -10.0 {
            Interpretation::Concerning
        } else if score < 10.0 {
            Interpretation::Neutral
        } else if score < 50.0 {
            Interpretation::Positive
        } else {
            Interpretation::VeryPositive
        }
    }

    /// Human-readable guidance.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Interpretation::Critical => {
                "Critical situation. Numerous severe threats detected. Immediate action required."
            }
            Interpretation::Concerning => {
                "Concerning situation. Multiple potential threats identified. Heightened vigilance needed."
            }
            Interpretation::Neutral => {
                "Neutral situation. No significant threats or improvements detected. Maintain standard security measures."
            }
            Interpretation::Positive => {
                "Positive situation. Some potential security improvements identified. Consider implementing suggested measures."
            }
            Interpretation::VeryPositive => {
                "Very positive situation. Strong security indicators present. Continue current security practices and look for areas of improvement."
            }
        }
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Count of records in one category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
    /// Share of all records, in percent.
    pub percentage: f64,
}

/// Aggregate over every record of a crawl.
#[derive(Debug, Clone, Serialize)]
pub struct SentimentReport {
    pub total_messages: usize,
    /// Mean compound score × 100.
    pub overall_score: f64,
    pub interpretation: Interpretation,
    /// One entry per category, zeros included, most severe first.
    pub categories: Vec<CategoryCount>,
    /// Lowest compound scores, lowest first.
    pub top_threats: Vec<MessageRecord>,
    /// Highest compound scores, highest first.
    pub top_positives: Vec<MessageRecord>,
    pub generated_at: DateTime<Utc>,
}

impl SentimentReport {
    /// Records counted in `category`.
    #[must_use]
    pub fn count_of(&self, category: Category) -> usize {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .map_or(0, |c| c.count)
    }
}

/// Result of summarizing the master aggregate.
#[derive(Debug, Clone)]
pub enum ReportOutcome {
    /// No records were collected.
    NothingToReport,
    /// The aggregate report.
    Ready(SentimentReport),
}

impl ReportOutcome {
    /// The report, if there is one.
    #[must_use]
    pub fn report(&self) -> Option<&SentimentReport> {
        match self {
            ReportOutcome::Ready(report) => Some(report),
            ReportOutcome::NothingToReport => None,
        }
    }
}

/// Builds a [`SentimentReport`] from scored records.
pub struct ReportSummarizer;

impl ReportSummarizer {
    /// Summarize `records`. Unscored records count as compound `0.0`.
    #[must_use]
    pub fn summarize(records: &[MessageRecord]) -> ReportOutcome {
        if records.is_empty() {
            return ReportOutcome::NothingToReport;
        }

        let total = records.len();
        let mean_compound = records.iter().map(MessageRecord::compound).sum::<f64>() / total as f64;
        let overall_score = mean_compound * 100.0;

        let categories = Category::all()
            .iter()
            .map(|&category| {
                let count = records
                    .iter()
                    .filter(|r| Category::from_compound(r.compound()) == category)
                    .count();
                CategoryCount {
                    category,
                    count,
                    percentage: count as f64 / total as f64 * 100.0,
                }
            })
            .collect();

        let mut ascending: Vec<&MessageRecord> = records.iter().collect();
        ascending.sort_by(|a, b| a.compound().total_cmp(&b.compound()));
        let top_threats = ascending.iter().take(TOP_N).map(|r| (*r).clone()).collect();

        let mut descending: Vec<&MessageRecord> = records.iter().collect();
        descending.sort_by(|a, b| b.compound().total_cmp(&a.compound()));
        let top_positives = descending.iter().take(TOP_N).map(|r| (*r).clone()).collect();

        tracing::debug!(total, overall_score, "Summarized records");

        ReportOutcome::Ready(SentimentReport {
            total_messages: total,
            overall_score,
            interpretation: Interpretation::from_score(overall_score),
            categories,
            top_threats,
            top_positives,
            generated_at: Utc::now(),
        })
    }
}
