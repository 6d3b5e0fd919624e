//! Telecrawl CLI - crawl Telegram channels and report on security sentiment.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use telecrawl::batch::{BatchAccumulator, CsvBatchWriter};
use telecrawl::config::{CrawlerConfig, DEFAULT_CONFIG_PATH};
use telecrawl::crawler::{CrawlOrchestrator, CrawlSettings, CrawlSummary};
use telecrawl::report::{console_summary, Category, HtmlReportRenderer, ReportOutcome};
use telecrawl::sentiment::{LexiconScorer, SentimentScorer};
use telecrawl::telegram::{PreviewConfig, WebPreviewClient};

/// Texts scored by `score` when none are given.
const SAMPLE_TEXTS: &[&str] = &[
    "The vulnerability in the firewall allowed a hacker to breach the system.",
    "Applying a patch improved the system's.",
    "Malware was detected but the antivirus swiftly removed it.",
    "The company's encryption techniques ensured data safety.",
    "A zero-day exploit was used to compromise the server we are putting it for sale",
    "After implementing multi-factor authentication, the system is way more secure",
    "The phishing attack failed due to user awareness training.",
    "The ransomware encrypted all files lmao\ndemanding a hefty ransom rn",
];

/// Telecrawl - discover linked Telegram channels and score their messages.
///
/// Without a subcommand, `crawl` runs with the top-level options.
#[derive(Parser)]
#[command(name = "telecrawl")]
#[command(about = "Telegram channel crawler with security sentiment reporting")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    crawl: CrawlArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl from the configured seed channels (default)
    Crawl(CrawlArgs),

    /// Score texts with the built-in lexicon
    Score {
        /// Texts to score (sample set if omitted)
        texts: Vec<String>,
    },
}

#[derive(Args)]
pub struct CrawlArgs {
    /// Path to the JSON config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Recent messages read per channel
    #[arg(long, default_value = "40")]
    message_depth: usize,

    /// Traversal passes over discovered channels
    #[arg(long, default_value = "2")]
    channel_depth: usize,

    /// Records per exported batch
    #[arg(long, default_value = "1000")]
    batch_size: usize,

    /// Directory for batch CSV files
    #[arg(long, default_value = "./batches")]
    batch_dir: PathBuf,

    /// Directory for HTML reports
    #[arg(long, default_value = "./reports")]
    report_dir: PathBuf,

    /// Scoring threads (defaults to available parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Seconds to pause after each channel
    #[arg(long, default_value = "1")]
    channel_delay: u64,

    /// Seconds to pause between passes
    #[arg(long, default_value = "5")]
    pass_delay: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("telecrawl=debug,info")
    } else {
        EnvFilter::new("telecrawl=info,warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command.unwrap_or(Commands::Crawl(cli.crawl)) {
        Commands::Crawl(args) => {
            let settings = CrawlSettings {
                message_depth: args.message_depth,
                channel_depth: args.channel_depth,
                channel_delay: Duration::from_secs(args.channel_delay),
                pass_delay: Duration::from_secs(args.pass_delay),
                ..Default::default()
            };
            let workers = args.workers.unwrap_or_else(|| {
                std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
            });

            tracing::info!(
                config = %args.config.display(),
                message_depth = args.message_depth,
                channel_depth = args.channel_depth,
                batch_size = args.batch_size,
                workers,
                "Starting crawl"
            );
            run_crawl(
                args.config,
                settings,
                args.batch_size,
                args.batch_dir,
                args.report_dir,
                workers,
            )
            .await
        }
        Commands::Score { texts } => {
            run_score(&texts);
            Ok(())
        }
    }
}

async fn run_crawl(
    config_path: PathBuf,
    settings: CrawlSettings,
    batch_size: usize,
    batch_dir: PathBuf,
    report_dir: PathBuf,
    workers: usize,
) -> Result<()> {
    let config = CrawlerConfig::load(&config_path)?;
    let credentials = config
        .validate()
        .with_context(|| format!("Invalid config {}", config_path.display()))?;
    tracing::debug!(?credentials, "Credentials resolved");

    let scorer: Arc<dyn SentimentScorer> = Arc::new(LexiconScorer::with_overrides(&config.lexicon));
    let writer = CsvBatchWriter::new(&batch_dir);
    let accumulator = BatchAccumulator::new(Box::new(writer), scorer, batch_size, workers);

    let client = WebPreviewClient::new(PreviewConfig::default())
        .context("Failed to build Telegram web client")?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!(
            "Interrupt received, saving collected messages (press Ctrl-C again to abort)"
        );
        interrupt.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Aborted, the final batch may be incomplete".red());
            std::process::exit(130);
        }
    });

    let orchestrator = CrawlOrchestrator::new(Arc::new(client), accumulator, settings, cancel);
    let summary = orchestrator.run(&config.initial_channel_links).await;

    print_summary(&summary, &batch_dir);

    match &summary.report {
        ReportOutcome::Ready(report) => {
            let renderer = HtmlReportRenderer::new()?;
            match renderer.write(report, &report_dir) {
                Ok(path) => println!(
                    "{} {}",
                    "Report saved to".green(),
                    path.display().to_string().as_str().bold()
                ),
                Err(e) => eprintln!("{} {e:#}", "Failed to write HTML report:".red()),
            }
            println!();
            print!("{}", console_summary(report));
        }
        ReportOutcome::NothingToReport => {
            println!("{}", "No messages to generate report from.".yellow());
        }
    }

    Ok(())
}

fn print_summary(summary: &CrawlSummary, batch_dir: &std::path::Path) {
    println!();
    if summary.cancelled {
        println!("{}", "Crawl interrupted, partial results saved".yellow().bold());
    } else {
        println!("{}", "Crawl complete".green().bold());
    }
    println!("   Took: {:.1}s", summary.elapsed.as_secs_f64());
    println!("   {}", summary.stats);
    println!("   Channels: {}", summary.frontier);
    println!(
        "   Batches: {} written to {} ({} records, {} failed writes)",
        summary.batches.flushes,
        batch_dir.display(),
        summary.batches.flushed_records,
        summary.batches.failed_writes
    );

    if !summary.processed.is_empty() {
        println!("   Processed:");
        for id in &summary.processed {
            println!("     - {id}");
        }
    }
    println!();
}

fn run_score(texts: &[String]) {
    let scorer = LexiconScorer::new();
    let samples: Vec<String> = if texts.is_empty() {
        SAMPLE_TEXTS.iter().map(ToString::to_string).collect()
    } else {
        texts.to_vec()
    };

    for text in &samples {
        let scores = scorer.score(text);
        let category = Category::from_compound(scores.compound);
        let flag = if scores.is_flagged() {
            "FLAGGED".red().bold()
        } else {
            "ok".green()
        };

        println!("{} {}", flag, text.replace('\n', " ").cyan());
        println!(
            "   neg {:.2}  neu {:.2}  pos {:.2}  compound {:.4}  [{}]",
            scores.neg, scores.neu, scores.pos, scores.compound, category
        );
    }

    println!(
        "\n{}",
        format!("Scored {} texts", samples.len()).as_str().green().bold()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawl_args(args: &[&str]) -> CrawlArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command.unwrap_or(Commands::Crawl(cli.crawl)) {
            Commands::Crawl(args) => args,
            Commands::Score { .. } => panic!("expected crawl"),
        }
    }

    #[test]
    fn test_crawl_is_the_default_command() {
        let args = crawl_args(&[
            "telecrawl",
            "--config",
            "custom.json",
            "--message-depth",
            "10",
            "--channel-depth",
            "3",
        ]);
        assert_eq!(args.config, PathBuf::from("custom.json"));
        assert_eq!(args.message_depth, 10);
        assert_eq!(args.channel_depth, 3);

        let defaults = crawl_args(&["telecrawl"]);
        assert_eq!(defaults.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(defaults.message_depth, 40);
        assert_eq!(defaults.channel_depth, 2);
    }

    #[test]
    fn test_explicit_subcommands() {
        let args = crawl_args(&["telecrawl", "crawl", "--channel-depth", "5"]);
        assert_eq!(args.channel_depth, 5);

        let cli = Cli::try_parse_from(["telecrawl", "score", "-v", "leaked creds"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Some(Commands::Score { texts }) if texts == ["leaked creds"]
        ));
    }
}
