//! Final sentiment report.
//!
//! [`ReportSummarizer`] turns the master aggregate into a [`SentimentReport`];
//! the renderers turn that into an HTML document and a console summary.

mod render;
mod summary;

pub use render::{console_summary, HtmlReportRenderer};
pub use summary::{
    Category, CategoryCount, Interpretation, ReportOutcome, ReportSummarizer, SentimentReport,
    TOP_N,
};
