//! JSON report and console summary
//!
//! The JSON report is the [`CrawlSummary`] with every float rounded to two
//! decimals. The console summary lists totals, the status code distribution
//! and per-domain statistics.

use crate::stats::CrawlSummary;
use crate::Result;
use chrono::Local;
use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Report file name used when none is configured
pub fn default_report_path() -> PathBuf {
    PathBuf::from(format!(
        "crawler_results_{}.json",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

/// Writes the summary as pretty-printed JSON
///
/// # Arguments
///
/// * `summary` - The finalized crawl summary
/// * `output_path` - Destination; a timestamped file in the working directory if `None`
///
/// # Returns
///
/// * `Ok(PathBuf)` - The path the report was written to
/// * `Err(CrawlError)` - Serialization or IO failure
pub fn write_json_report(summary: &CrawlSummary, output_path: Option<&Path>) -> Result<PathBuf> {
    let path = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_report_path);

    let json = serde_json::to_string_pretty(&summary.rounded())?;
    let mut file = File::create(&path)?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;

    tracing::info!("Report written to {}", path.display());
    Ok(path)
}

/// Human-readable name of a status code
pub fn status_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown")
}

/// Formats the console summary
pub fn format_summary(summary: &CrawlSummary, report_path: Option<&Path>) -> String {
    let summary = summary.rounded();
    let mut out = String::new();

    let _ = writeln!(out, "\n=== Crawling Summary ===");
    let _ = writeln!(out, "Total execution time: {:.2} seconds", summary.total_time_of_script);
    let _ = writeln!(out, "Total URLs crawled: {}", summary.total_number_of_urls_crawled);
    let _ = writeln!(out, "Total errors: {}", summary.total_number_of_errors);
    let _ = writeln!(out, "Total domains: {}", summary.total_number_of_domains);
    let _ = writeln!(out, "Crawl rate: {:.2} URLs/sec", summary.crawl_rate_per_second);

    let _ = writeln!(out, "\nStatus Code Distribution:");
    write_statuses(&mut out, &summary.status_code_statistics, "  ");

    let _ = writeln!(out, "\nPer-Domain Statistics:");
    for (domain, stats) in &summary.domain_statistics {
        let _ = writeln!(out, "\n{}:", domain);
        let _ = writeln!(out, "  Time to crawl: {:.2} seconds", stats.total_time_to_crawl);
        let _ = writeln!(out, "  URLs crawled: {}", stats.total_number_of_crawled_urls);
        let _ = writeln!(out, "  Requests: {}", stats.total_number_of_requests);
        let _ = writeln!(out, "  Errors encountered: {}", stats.total_number_of_errors);

        if !stats.status_code_statistics.is_empty() {
            let _ = writeln!(out, "  Status Code Distribution:");
            write_statuses(&mut out, &stats.status_code_statistics, "    ");
        }
    }

    if let Some(path) = report_path {
        let _ = writeln!(out, "\nDetailed results saved to: {}", path.display());
    }

    out
}

fn write_statuses(out: &mut String, statuses: &BTreeMap<u16, u64>, indent: &str) {
    for (status, count) in statuses {
        let _ = writeln!(out, "{}{} ({}): {}", indent, status, status_reason(*status), count);
    }
}

/// Prints the console summary to stdout
pub fn print_summary(summary: &CrawlSummary, report_path: Option<&Path>) {
    print!("{}", format_summary(summary, report_path));
}
