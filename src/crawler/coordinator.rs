//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Seeding the frontier and applying the admission policy
//! - Dispatching fetch workers under the controller's limits
//! - Folding discovered links back into the frontier
//! - Applying fetch measurements to the statistics
//! - Handling cancellation

use crate::config::{prepare, CrawlConfig};
use crate::crawler::controller::{ConcurrencyController, RetryPolicy};
use crate::crawler::fetcher::{FetchOutcome, FetchReport, Fetcher};
use crate::crawler::frontier::{CrawlPolicy, Frontier, FrontierEntry};
use crate::crawler::transport::{ReqwestTransport, Transport};
use crate::stats::{CrawlSummary, StatsAggregator};
use crate::url::{extract_domain, normalize_url};
use crate::{CrawlError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{Id, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Cadence of the progress snapshot
const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Main crawler coordinator structure
pub struct Coordinator {
    config: CrawlConfig,
    controller: Arc<ConcurrencyController>,
    fetcher: Arc<Fetcher>,
}

impl Coordinator {
    /// Creates a coordinator that fetches over HTTP
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Configuration is valid and the client was built
    /// * `Err(CrawlError)` - Invalid configuration or client construction failure
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.user_agent)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a coordinator over any [`Transport`]
    ///
    /// The configuration is normalized and validated first. The seed host and
    /// every allow-listed host are tracked by the controller before the run,
    /// so the base-domain cross-check has something to compare against.
    pub fn with_transport(config: CrawlConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let config = prepare(config)?;

        let controller = Arc::new(ConcurrencyController::new(
            config.crawler.concurrency_limit,
            RetryPolicy::new(config.crawler.max_retries),
        ));

        let seed = normalize_url(&config.crawler.seed)?;
        if let Some(host) = extract_domain(&seed) {
            controller.track_host(&host);
        }
        for domain in &config.crawler.allowed_domains {
            controller.track_host(domain);
        }

        let fetcher = Arc::new(Fetcher::new(
            transport,
            controller.clone(),
            config.request_timeout(),
        ));

        Ok(Self {
            config,
            controller,
            fetcher,
        })
    }

    /// The controller shared with the workers of this run
    pub fn controller(&self) -> Arc<ConcurrencyController> {
        self.controller.clone()
    }

    /// The normalized configuration of this run
    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Runs the crawl to completion
    pub async fn run(self) -> Result<CrawlSummary> {
        self.run_with_cancellation(CancellationToken::new()).await
    }

    /// Runs the crawl until the frontier and the in-flight set are both empty
    ///
    /// Each iteration dispatches admitted entries while fewer than
    /// `concurrency_limit` fetches are in flight, then waits for one of:
    /// a completion, the progress tick, or cancellation. Completions are
    /// applied one at a time, so the frontier, the visited set and the
    /// statistics are only ever touched here.
    ///
    /// On cancellation every in-flight fetch is aborted and awaited before
    /// [`CrawlError::Cancelled`] is returned, which releases all capacity.
    pub async fn run_with_cancellation(self, cancel: CancellationToken) -> Result<CrawlSummary> {
        let crawler = &self.config.crawler;
        let seed = normalize_url(&crawler.seed)?;
        let limit = crawler.concurrency_limit;

        tracing::info!(
            "Starting crawl of {} (max depth {}, concurrency {})",
            seed,
            crawler.max_depth,
            limit
        );

        let mut frontier = Frontier::new(CrawlPolicy {
            max_depth: crawler.max_depth,
            allowed_domains: crawler.allowed_domains.clone(),
            blacklist_extensions: crawler.blacklist_extensions.clone(),
        });
        frontier.push(FrontierEntry::new(seed, 0));

        let mut stats = StatsAggregator::new();
        let mut tasks: JoinSet<FetchReport> = JoinSet::new();
        let mut in_flight: HashMap<Id, FrontierEntry> = HashMap::new();

        let mut progress = tokio::time::interval(PROGRESS_INTERVAL);
        progress.set_missed_tick_behavior(MissedTickBehavior::Delay);
        progress.tick().await;

        loop {
            if cancel.is_cancelled() {
                Self::abort_in_flight(&mut tasks, &mut in_flight).await;
                return Err(CrawlError::Cancelled);
            }

            while tasks.len() < limit {
                let Some(entry) = frontier.next_admitted() else {
                    break;
                };
                tracing::debug!("Dispatching {} at depth {}", entry.url, entry.depth);

                let fetcher = self.fetcher.clone();
                let url = entry.url.clone();
                let handle = tasks.spawn(async move { fetcher.fetch(url).await });
                in_flight.insert(handle.id(), entry);
            }

            if tasks.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    Self::abort_in_flight(&mut tasks, &mut in_flight).await;
                    return Err(CrawlError::Cancelled);
                }

                joined = tasks.join_next_with_id() => match joined {
                    Some(Ok((id, report))) => {
                        let entry = in_flight.remove(&id);
                        Self::complete(&mut frontier, &mut stats, entry, report);
                    }
                    Some(Err(e)) => {
                        let entry = in_flight.remove(&e.id());
                        let host = entry.as_ref().and_then(|entry| extract_domain(&entry.url));
                        tracing::error!(
                            "Fetch task for {} ended abnormally: {}",
                            entry.as_ref().map_or("<unknown>", |entry| entry.url.as_str()),
                            e
                        );
                        stats.record_task_error(host.as_deref());
                    }
                    None => {}
                },

                _ = progress.tick() => {
                    tracing::info!(
                        "Progress: {} crawled, {} in frontier, {} in flight, {:.1} URLs/sec, {:.0?} elapsed",
                        stats.stats().total_crawled,
                        frontier.len(),
                        tasks.len(),
                        stats.crawl_rate(),
                        stats.elapsed()
                    );
                }
            }
        }

        let summary = stats.finalize();
        tracing::info!(
            "Crawl completed: {} URLs crawled, {} errors, {} domains in {:.2}s",
            summary.total_number_of_urls_crawled,
            summary.total_number_of_errors,
            summary.total_number_of_domains,
            summary.total_time_of_script
        );
        Ok(summary)
    }

    /// Applies one completed fetch
    fn complete(
        frontier: &mut Frontier,
        stats: &mut StatsAggregator,
        entry: Option<FrontierEntry>,
        report: FetchReport,
    ) {
        stats.record(&report);

        match report.outcome {
            FetchOutcome::Success { links, title, .. } => {
                let Some(entry) = entry else {
                    tracing::warn!(
                        "No frontier entry for {}, dropping {} links",
                        report.url,
                        links.len()
                    );
                    return;
                };
                let depth = entry.depth;
                let found = links.len();
                let added = frontier.enqueue_links(depth, links);
                tracing::debug!(
                    "Processed {} ({:?}): {} links found, {} queued",
                    report.url,
                    title,
                    found,
                    added
                );
            }
            FetchOutcome::Skipped(reason) => {
                tracing::debug!("Skipped {}: {:?}", report.url, reason);
            }
            FetchOutcome::Failed(kind) => {
                tracing::debug!("Failed {}: {}", report.url, kind);
            }
        }
    }

    /// Aborts every in-flight fetch and waits until each has been dropped
    async fn abort_in_flight(
        tasks: &mut JoinSet<FetchReport>,
        in_flight: &mut HashMap<Id, FrontierEntry>,
    ) {
        tracing::warn!("Crawl cancelled, aborting {} in-flight fetches", tasks.len());
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        in_flight.clear();
    }
}

/// Runs a complete crawl over HTTP
///
/// # Example
///
/// ```no_run
/// use tide_crawler::config::CrawlConfig;
/// use tide_crawler::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CrawlConfig::new("https://example.com/", 2)
///     .with_allowed_domains(["example.com"]);
/// let summary = run_crawl(config).await?;
/// println!("{} URLs crawled", summary.total_number_of_urls_crawled);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: CrawlConfig) -> Result<CrawlSummary> {
    Coordinator::new(config)?.run().await
}
