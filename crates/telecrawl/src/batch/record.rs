//! Exported message record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::frontier::Affiliation;
use crate::sentiment::SentimentScores;
use crate::telegram::RemoteMessage;

/// One collected message.
///
/// Channel name and affiliation are stamped when the record enters a batch;
/// sentiment is attached once, when the batch is flushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Sender identifier, empty when the platform hides it.
    pub sender: Option<String>,
    /// When the message was posted.
    pub timestamp: DateTime<Utc>,
    /// Message text.
    pub text: String,
    /// Scores, `None` until flushed.
    pub sentiment: Option<SentimentScores>,
    /// Display name of the channel the message came from.
    pub channel_name: String,
    /// Channel that led the crawl to this one.
    pub affiliation: Affiliation,
}

impl MessageRecord {
    /// Unstamped, unscored record.
    #[must_use]
    pub fn new(sender: Option<String>, timestamp: DateTime<Utc>, text: impl Into<String>) -> Self {
        Self {
            sender,
            timestamp,
            text: text.into(),
            sentiment: None,
            channel_name: String::new(),
            affiliation: Affiliation::Initial,
        }
    }

    /// Build a record from a remote message; media-only messages yield `None`.
    #[must_use]
    pub fn from_remote(message: RemoteMessage) -> Option<Self> {
        let text = message.text.filter(|t| !t.trim().is_empty())?;
        Some(Self::new(message.sender, message.timestamp, text))
    }

    /// Compound score, `0.0` when unscored.
    #[must_use]
    pub fn compound(&self) -> f64 {
        self.sentiment.map_or(0.0, |s| s.compound)
    }
}
