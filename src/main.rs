//! Tide main entry point
//!
//! This is the command-line interface for the Tide site crawler.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use tide_crawler::config::{
    load_config, CrawlConfig, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_MAX_RETRIES,
};
use tide_crawler::crawler::Coordinator;
use tide_crawler::output::{print_summary, write_json_report};
use tide_crawler::url::{extract_domain, normalize_url};
use tide_crawler::CrawlError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Tide: a polite breadth-first site crawler
///
/// Tide crawls a site from a starting URL, bounded by depth, an allow-list of
/// domains and a blacklist of file extensions. It limits concurrency globally
/// and per host, backs off on rate limits, and writes a JSON report.
#[derive(Parser, Debug)]
#[command(name = "tide-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A polite breadth-first site crawler", long_about = None)]
struct Cli {
    /// Starting URL (must begin with http:// or https://)
    #[arg(value_name = "START_URL", value_parser = parse_start_url, required_unless_present = "config")]
    start_url: Option<String>,

    /// Maximum link depth from the starting URL
    #[arg(long, required_unless_present = "config")]
    max_depth: Option<u32>,

    /// Allowed domains (defaults to the starting URL's host)
    #[arg(long, num_args = 1..)]
    domains: Vec<String>,

    /// File extensions to skip, e.g. .png pdf
    #[arg(long, num_args = 1..)]
    blacklist: Vec<String>,

    /// Maximum concurrent requests [default: 10]
    #[arg(long)]
    concurrency: Option<usize>,

    /// Retries for transient failures [default: 3]
    #[arg(long)]
    max_retries: Option<u32>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Where to write the JSON report
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn parse_start_url(value: &str) -> Result<String, String> {
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err("Starting URL must begin with http:// or https://".to_string());
    }
    normalize_url(value)
        .map(|url| url.to_string())
        .map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    print_banner(&config);

    let coordinator = Coordinator::new(config).context("Failed to initialize crawler")?;
    let report_path = coordinator.config().output.report_path.clone();

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            ctrl_c_token.cancel();
        }
    });

    let summary = match coordinator.run_with_cancellation(token).await {
        Ok(summary) => summary,
        Err(CrawlError::Cancelled) => {
            eprintln!("\nCrawl interrupted by user");
            bail!(CrawlError::Cancelled);
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    let path = write_json_report(&summary, report_path.as_deref().map(Path::new))
        .context("Failed to write report")?;
    print_summary(&summary, Some(&path));

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tide_crawler=info,warn"),
            1 => EnvFilter::new("tide_crawler=debug,info"),
            2 => EnvFilter::new("tide_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds the crawl configuration from the config file and flags
///
/// Flags override values from the file. When no allow-list is given the
/// crawl stays on the starting URL's host.
fn build_config(cli: &Cli) -> anyhow::Result<CrawlConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => {
            let (Some(seed), Some(max_depth)) = (&cli.start_url, cli.max_depth) else {
                bail!("A starting URL and --max-depth are required without --config");
            };
            CrawlConfig::new(seed.clone(), max_depth)
        }
    };

    if let Some(seed) = &cli.start_url {
        config.crawler.seed = seed.clone();
    }
    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if !cli.domains.is_empty() {
        config.crawler.allowed_domains = cli.domains.clone();
    }
    if !cli.blacklist.is_empty() {
        config.crawler.blacklist_extensions = cli.blacklist.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.concurrency_limit = concurrency;
    }
    if let Some(max_retries) = cli.max_retries {
        config.crawler.max_retries = max_retries;
    }
    if let Some(output) = &cli.output {
        config.output.report_path = Some(output.display().to_string());
    }

    if config.crawler.allowed_domains.is_empty() {
        let seed = normalize_url(&config.crawler.seed).context("Invalid starting URL")?;
        if let Some(host) = extract_domain(&seed) {
            config.crawler.allowed_domains = vec![host];
        }
    }

    Ok(config)
}

fn print_banner(config: &CrawlConfig) {
    let crawler = &config.crawler;
    println!("=== Tide Crawler ===\n");
    println!("Start URL: {}", crawler.seed);
    println!("Max depth: {}", crawler.max_depth);
    println!("Allowed domains: {}", crawler.allowed_domains.join(", "));
    if crawler.blacklist_extensions.is_empty() {
        println!("Blacklisted extensions: none");
    } else {
        println!(
            "Blacklisted extensions: {}",
            crawler.blacklist_extensions.join(", ")
        );
    }
    println!(
        "Concurrency: {}{}",
        crawler.concurrency_limit,
        if crawler.concurrency_limit == DEFAULT_CONCURRENCY_LIMIT { " (default)" } else { "" }
    );
    println!(
        "Max retries: {}{}",
        crawler.max_retries,
        if crawler.max_retries == DEFAULT_MAX_RETRIES { " (default)" } else { "" }
    );
    println!("User agent: {}", config.user_agent.header_value());
    println!();
}
