use crate::crawler::{FetchOutcome, FetchReport};
use crate::stats::summary::{CrawlSummary, DomainSummary};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;

/// Counters for a single host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainStats {
    /// URLs fetched and parsed successfully
    pub crawled: u64,

    /// URLs that failed after all attempts
    pub errors: u64,

    /// Requests issued, retries included
    pub requests: u64,

    /// Responses by status code
    pub status_codes: BTreeMap<u16, u64>,

    /// When the first request to this host was issued
    pub first_request_time: Option<DateTime<Utc>>,

    /// When the last request to this host finished
    pub last_request_time: Option<DateTime<Utc>>,
}

impl DomainStats {
    /// Time between the first and the last request to this host
    pub fn time_to_crawl(&self) -> Duration {
        match (self.first_request_time, self.last_request_time) {
            (Some(first), Some(last)) => (last - first).to_std().unwrap_or(Duration::ZERO),
            _ => Duration::ZERO,
        }
    }
}

/// Run-wide counters
#[derive(Debug, Clone, Default)]
pub struct GlobalStats {
    pub total_crawled: u64,
    pub total_errors: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub domains: BTreeMap<String, DomainStats>,

    /// URLs that produced a `Success`, in completion order
    pub crawled_urls: Vec<String>,
}

/// Owns the statistics of one run
#[derive(Debug)]
pub struct StatsAggregator {
    started: Instant,
    stats: GlobalStats,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsAggregator {
    /// Starts the run clock
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            stats: GlobalStats::default(),
        }
    }

    /// Applies the measurements of one completed fetch
    ///
    /// Every attempt updates the histograms, request counts and timing of its
    /// host. The outcome then counts once: a success as crawled, a failure as
    /// one error. Skips count neither way.
    pub fn record(&mut self, report: &FetchReport) {
        for attempt in &report.attempts {
            let domain = self.stats.domains.entry(report.host.clone()).or_default();
            domain.requests += 1;
            if domain.first_request_time.is_none() {
                domain.first_request_time = Some(attempt.started_at);
            }
            let finished = attempt.finished_at();
            if domain.last_request_time.map_or(true, |last| finished > last) {
                domain.last_request_time = Some(finished);
            }

            if let Some(status) = attempt.status {
                *domain.status_codes.entry(status).or_insert(0) += 1;
                *self.stats.status_codes.entry(status).or_insert(0) += 1;
            }
        }

        match &report.outcome {
            FetchOutcome::Success { .. } => {
                self.stats.total_crawled += 1;
                self.stats.crawled_urls.push(report.url.to_string());
                self.domain_mut(&report.host).crawled += 1;
            }
            FetchOutcome::Failed(_) => {
                self.stats.total_errors += 1;
                if !report.host.is_empty() {
                    self.domain_mut(&report.host).errors += 1;
                }
            }
            FetchOutcome::Skipped(_) => {}
        }
    }

    /// Counts an error that produced no report, such as a worker panic
    pub fn record_task_error(&mut self, host: Option<&str>) {
        self.stats.total_errors += 1;
        if let Some(host) = host {
            self.domain_mut(host).errors += 1;
        }
    }

    fn domain_mut(&mut self, host: &str) -> &mut DomainStats {
        self.stats.domains.entry(host.to_string()).or_default()
    }

    /// Live view of the counters
    pub fn stats(&self) -> &GlobalStats {
        &self.stats
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// URLs crawled per second so far
    pub fn crawl_rate(&self) -> f64 {
        rate(self.stats.total_crawled, self.elapsed())
    }

    /// Computes wall time, rate and domain count, dropping the timestamps
    pub fn finalize(self) -> CrawlSummary {
        let total_time = self.elapsed();
        let stats = self.stats;

        let domain_statistics = stats
            .domains
            .iter()
            .map(|(host, domain)| {
                (
                    host.clone(),
                    DomainSummary {
                        total_time_to_crawl: domain.time_to_crawl().as_secs_f64(),
                        total_number_of_crawled_urls: domain.crawled,
                        total_number_of_errors: domain.errors,
                        total_number_of_requests: domain.requests,
                        status_code_statistics: domain.status_codes.clone(),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        CrawlSummary {
            total_time_of_script: total_time.as_secs_f64(),
            total_number_of_urls_crawled: stats.total_crawled,
            total_number_of_errors: stats.total_errors,
            total_number_of_domains: domain_statistics.len(),
            crawl_rate_per_second: rate(stats.total_crawled, total_time),
            status_code_statistics: stats.status_codes,
            domain_statistics,
            crawled_urls: stats.crawled_urls,
        }
    }
}

fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}
