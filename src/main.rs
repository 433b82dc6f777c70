//! # prospect-audit CLI
//!
//! Command-line front end for the site auditor.
//!
//! ## Key Components
//!
//! - CLI argument parsing with clap
//! - `audit`: crawl one or more sites and print their signal bundles
//!
//! ## Features
//!
//! - Sites read from arguments and/or a file, one URL per line
//! - Configurable budget, timeout and courtesy delay
//! - Progress tracking across sites
//! - Both JSON and text output formats

mod logging;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use prospect_audit::audit::{Auditor, SignalBundle, render_text};
use prospect_audit::crawler::{
    AuditConfig, DEFAULT_MAX_PAGES, DEFAULT_RATE_LIMIT_MS, DEFAULT_TIMEOUT_SECS,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, instrument};

#[derive(Parser)]
#[command(author, version, about = "Audit small-business websites for prospecting signals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Also write a detailed log file into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl sites and report their signals
    Audit(AuditArgs),
}

#[derive(Args, Debug)]
struct AuditArgs {
    /// Sites to audit (bare domains get https://)
    urls: Vec<String>,

    /// File with one URL per line; blank lines and # comments are skipped
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Maximum number of pages to fetch per site
    #[arg(short = 'p', long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: u32,

    /// Per-request timeout in seconds
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Delay between requests in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_RATE_LIMIT_MS)]
    delay: u64,

    /// Ignore robots.txt disallow rules
    #[arg(long)]
    no_robots: bool,

    /// Evaluate dates against this day (YYYY-MM-DD) instead of today
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// One audited site in the JSON report
#[derive(Debug, Serialize)]
struct SiteReport {
    url: String,
    #[serde(flatten)]
    signals: SignalBundle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::setup_logging(cli.log_dir.as_deref())?;

    match cli.command {
        Some(Commands::Audit(args)) => {
            audit_command(args).await?;
        }
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["prospect-audit", "--help"]);
        }
    }

    Ok(())
}

/// Collect URLs from the command line and an optional input file, in order,
/// without duplicates
fn load_urls(urls: &[String], input: Option<&Path>) -> anyhow::Result<Vec<String>> {
    let mut all: Vec<String> = urls.iter().map(|u| u.trim().to_string()).collect();

    if let Some(path) = input {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading URL list {}", path.display()))?;
        all.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }

    let mut seen = std::collections::HashSet::new();
    all.retain(|url| !url.is_empty() && seen.insert(url.clone()));
    Ok(all)
}

#[instrument]
async fn audit_command(args: AuditArgs) -> anyhow::Result<()> {
    let urls = load_urls(&args.urls, args.input.as_deref())?;
    if urls.is_empty() {
        anyhow::bail!("no site to audit: pass URLs or --input FILE");
    }

    let mut builder = AuditConfig::builder()
        .max_pages(args.max_pages)
        .timeout(Duration::from_secs(args.timeout))
        .rate_limit_ms(args.delay)
        .respect_robots_txt(!args.no_robots);
    if let Some(as_of) = args.as_of {
        builder = builder.as_of(as_of);
    }
    let auditor = Auditor::new(builder.build())?;

    let progress_bar = ProgressBar::new(urls.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")?
            .progress_chars("##-"),
    );

    let mut reports = Vec::with_capacity(urls.len());
    for url in urls {
        progress_bar.set_message(url.clone());
        let signals = match auditor.audit(&url).await {
            Ok(signals) => signals,
            Err(e) => {
                error!(%url, error = %e, "Audit failed");
                SignalBundle {
                    audit_erreur: Some(e.to_string()),
                    ..SignalBundle::default()
                }
            }
        };
        reports.push(SiteReport { url, signals });
        progress_bar.inc(1);
    }
    progress_bar.finish_with_message("Audit completed");

    let rendered = match args.format.as_str() {
        "json" => serde_json::to_string_pretty(&reports)?,
        _ => reports
            .iter()
            .map(|r| render_text(&r.url, &r.signals))
            .collect::<Vec<_>>()
            .join("\n"),
    };

    match args.output {
        Some(output_file) => {
            tokio::fs::write(&output_file, rendered).await?;
            println!("Saved report to {}", output_file.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
