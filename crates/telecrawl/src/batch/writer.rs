//! Durable batch output.

use std::io;
use std::path::{Path, PathBuf};

use super::record::MessageRecord;

/// File name prefix of every batch file.
pub const BATCH_FILE_PREFIX: &str = "telegram_scraped_messages_batch";

const HEADER: [&str; 7] = [
    "Sender ID",
    "Date",
    "Message",
    "Sentiment",
    "Compound",
    "Channel Name",
    "Affiliated Channel",
];

/// Destination for flushed batches.
pub trait BatchSink: Send {
    /// Persist one batch under its sequence number, returning where it went.
    fn write_batch(&mut self, sequence: u64, records: &[MessageRecord]) -> io::Result<PathBuf>;
}

/// Writes each batch to `<dir>/telegram_scraped_messages_batch_<n>.csv`.
#[derive(Debug, Clone)]
pub struct CsvBatchWriter {
    dir: PathBuf,
}

impl CsvBatchWriter {
    /// Writer targeting `dir`, created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of batch `sequence`.
    #[must_use]
    pub fn path_for(&self, sequence: u64) -> PathBuf {
        self.dir.join(format!("{BATCH_FILE_PREFIX}_{sequence}.csv"))
    }
}

impl BatchSink for CsvBatchWriter {
    fn write_batch(&mut self, sequence: u64, records: &[MessageRecord]) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(sequence);

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(HEADER)?;

        for record in records {
            let sentiment = match &record.sentiment {
                Some(scores) => serde_json::to_string(scores)?,
                None => String::new(),
            };
            let compound = record.compound().to_string();
            let timestamp = record.timestamp.to_rfc3339();
            let affiliation = record.affiliation.to_string();

            writer.write_record([
                record.sender.as_deref().unwrap_or_default(),
                timestamp.as_str(),
                record.text.as_str(),
                sentiment.as_str(),
                compound.as_str(),
                record.channel_name.as_str(),
                affiliation.as_str(),
            ])?;
        }

        writer.flush()?;
        Ok(path)
    }
}
