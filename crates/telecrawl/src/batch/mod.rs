//! Message batching and durable export.
//!
//! [`BatchAccumulator`] buffers records until the size threshold, scores them
//! on flush, writes them through a [`BatchSink`] and keeps every record in a
//! master aggregate for the final report.

mod accumulator;
mod record;
mod writer;

pub use accumulator::{BatchAccumulator, BatchStats, FlushOutcome};
pub use record::MessageRecord;
pub use writer::{BatchSink, CsvBatchWriter, BATCH_FILE_PREFIX};
