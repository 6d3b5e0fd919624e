//! HTML and console rendering of a [`SentimentReport`].

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use handlebars::Handlebars;
use serde::Serialize;

use crate::batch::MessageRecord;

use super::summary::{Category, SentimentReport};

/// Characters of message text shown per row.
const EXCERPT_CHARS: usize = 100;

#[derive(Serialize)]
struct CategoryRow {
    label: &'static str,
    description: &'static str,
    count: usize,
    percentage: String,
}

#[derive(Serialize)]
struct MessageRow {
    excerpt: String,
    channel: String,
    compound: String,
}

#[derive(Serialize)]
struct ReportView {
    date_generated: String,
    total_messages: usize,
    overall_score: String,
    interpretation: &'static str,
    categories: Vec<CategoryRow>,
    top_threats: Vec<MessageRow>,
    top_positives: Vec<MessageRow>,
}

impl ReportView {
    fn from_report(report: &SentimentReport) -> Self {
        Self {
            date_generated: report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            total_messages: report.total_messages,
            overall_score: format!("{:.2}", report.overall_score),
            interpretation: report.interpretation.message(),
            categories: report
                .categories
                .iter()
                .map(|c| CategoryRow {
                    label: c.category.label(),
                    description: c.category.description(),
                    count: c.count,
                    percentage: format!("{:.1}", c.percentage),
                })
                .collect(),
            top_threats: report.top_threats.iter().map(message_row).collect(),
            top_positives: report.top_positives.iter().map(message_row).collect(),
        }
    }
}

fn message_row(record: &MessageRecord) -> MessageRow {
    MessageRow {
        excerpt: excerpt(&record.text),
        channel: record.channel_name.clone(),
        compound: format!("{:.4}", record.compound()),
    }
}

/// First `EXCERPT_CHARS` characters, with an ellipsis when cut.
fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Renders reports into standalone HTML documents.
pub struct HtmlReportRenderer {
    handlebars: Handlebars<'static>,
}

impl HtmlReportRenderer {
    /// Renderer with the embedded template.
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_template_string("report", REPORT_TEMPLATE)?;
        Ok(Self { handlebars })
    }

    /// Render `report` to HTML.
    pub fn render(&self, report: &SentimentReport) -> Result<String> {
        let view = ReportView::from_report(report);
        let html = self.handlebars.render("report", &view)?;
        Ok(html)
    }

    /// Render and write to `<dir>/report-<unix-ts>.html`.
    pub fn write(&self, report: &SentimentReport, dir: &Path) -> Result<PathBuf> {
        let html = self.render(report)?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create report directory {}", dir.display()))?;

        let path = dir.join(format!("report-{}.html", report.generated_at.timestamp()));
        std::fs::write(&path, html)
            .with_context(|| format!("Failed to write report {}", path.display()))?;

        tracing::info!(path = %path.display(), "Report written");
        Ok(path)
    }
}

fn paint(category: Category, text: &str) -> ColoredString {
    match category {
        Category::HighAlert => text.red(),
        Category::PotentialThreat => text.yellow(),
        Category::Neutral => text.white(),
        Category::PotentiallyPositive => text.bright_green(),
        Category::VeryPositive => text.green(),
    }
}

/// Console summary with per-category colors.
#[must_use]
pub fn console_summary(report: &SentimentReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "Sentiment Report".bold().cyan());
    let _ = writeln!(out, "Total messages analyzed: {}", report.total_messages);
    let _ = writeln!(
        out,
        "Overall sentiment score: {:.2}/100",
        report.overall_score
    );
    let _ = writeln!(out, "{}", report.interpretation.message().italic());
    let _ = writeln!(out);
    let _ = writeln!(out, "Sentiment category counts:");

    for entry in &report.categories {
        let line = format!(
            "  {}: {} ({:.1}%)",
            entry.category, entry.count, entry.percentage
        );
        let _ = writeln!(out, "{}", paint(entry.category, &line));
    }

    out
}

const REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Sentiment Analysis Report</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 0; padding: 20px; background-color: #f4f4f9; color: #333; }
        h1 { color: #444; }
        table { width: 100%; border-collapse: collapse; margin-bottom: 20px; }
        table, th, td { border: 1px solid #ddd; }
        th, td { padding: 10px; text-align: left; }
        th { background-color: #f2f2f2; }
        .report-summary { margin-bottom: 20px; }
    </style>
</head>
<body>
    <h1>Sentiment Analysis Report</h1>
    <p><strong>Date Generated:</strong> {{date_generated}}</p>
    <div class="report-summary">
        <p><strong>Total Messages Analyzed:</strong> {{total_messages}}</p>
        <p><strong>Overall Sentiment Score:</strong> {{overall_score}}/100</p>
        <p><strong>Interpretation:</strong> {{interpretation}}</p>
    </div>

    <h2>Message Sentiment Breakdown</h2>
    <table>
        <thead>
            <tr><th>Category</th><th>Description</th><th>Count</th><th>Percentage</th></tr>
        </thead>
        <tbody>
            {{#each categories}}
            <tr><td>{{label}}</td><td>{{description}}</td><td>{{count}}</td><td>{{percentage}}%</td></tr>
            {{/each}}
        </tbody>
    </table>

    <h2>Top 5 Most Concerning Messages (Potential Threats)</h2>
    <table>
        <thead>
            <tr><th>Message</th><th>Channel</th><th>Threat Level (Compound Score)</th></tr>
        </thead>
        <tbody>
            {{#each top_threats}}
            <tr><td>{{excerpt}}</td><td>{{channel}}</td><td>{{compound}}</td></tr>
            {{/each}}
        </tbody>
    </table>

    <h2>Top 5 Most Positive Messages (Potential Security Improvements)</h2>
    <table>
        <thead>
            <tr><th>Message</th><th>Channel</th><th>Positivity Level (Compound Score)</th></tr>
        </thead>
        <tbody>
            {{#each top_positives}}
            <tr><td>{{excerpt}}</td><td>{{channel}}</td><td>{{compound}}</td></tr>
            {{/each}}
        </tbody>
    </table>
</body>
</html>
"#;
