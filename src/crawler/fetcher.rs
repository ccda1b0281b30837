//! Fetch worker
//!
//! This module performs one fetch+parse+extract cycle for a single URL:
//! - Cross-checking the host against the hosts already being crawled
//! - Acquiring global and per-host capacity from the controller
//! - Issuing the request with a bounded timeout
//! - Applying the 429 cool-down and the generic retry policy
//! - Skipping unsupported content types
//! - Parsing the document and extracting links and the title
//!
//! The worker never touches shared counters. Every attempt is recorded in
//! the returned [`FetchReport`] and the coordinator applies it.

use crate::crawler::controller::{retry_after_delay, ConcurrencyController, RetryPolicy};
use crate::crawler::parser::{is_allowed_content_type, parse_document};
use crate::crawler::transport::{Transport, TransportError, TransportResponse};
use crate::url::extract_domain;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use url::Url;

/// Result of fetching one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The document was fetched and parsed
    Success {
        /// Absolute http(s) links found in the document
        links: Vec<Url>,
        /// Document title, empty if absent
        title: String,
        /// Size of the response body in bytes
        byte_size: usize,
    },

    /// Nothing to crawl here, but nothing went wrong either
    Skipped(SkipReason),

    /// The URL failed after all allowed attempts
    Failed(FetchErrorKind),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Why a fetch yielded nothing without being an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// HTTP 429; the host is cooling down for `retry_after`
    RateLimited { retry_after: Duration },

    /// The response was not HTML, XHTML or XML
    UnsupportedContentType(String),

    /// The host shares no base domain with any host being crawled
    ExternalDomain(String),
}

/// Why a fetch failed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchErrorKind {
    #[error("Transient network error: {0}")]
    TransientNetwork(TransportError),

    #[error("Server error: HTTP {0}")]
    ServerError(u16),

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("Request failed: {0}")]
    Request(TransportError),

    #[error("URL has no host")]
    MissingHost,

    #[error("Admission capacity closed")]
    Closed,
}

/// Measurements taken for one request attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Response status; None when no response arrived
    pub status: Option<u16>,

    /// Wall-clock time the request was issued
    pub started_at: DateTime<Utc>,

    /// Time spent waiting for the response
    pub elapsed: Duration,
}

impl AttemptRecord {
    /// Wall-clock time the attempt finished
    pub fn finished_at(&self) -> DateTime<Utc> {
        self.started_at + chrono::Duration::from_std(self.elapsed).unwrap_or_else(|_| chrono::Duration::zero())
    }
}

/// Everything a worker hands back to the coordinator
#[derive(Debug, Clone)]
pub struct FetchReport {
    /// The URL that was fetched
    pub url: Url,

    /// Lower-cased host of `url` (empty if it has none)
    pub host: String,

    /// Final outcome
    pub outcome: FetchOutcome,

    /// One record per request issued, in order
    pub attempts: Vec<AttemptRecord>,
}

/// Outcome of a single attempt
enum Attempt {
    Done(FetchOutcome),
    Retry(FetchErrorKind),
}

/// Performs fetches under the controller's limits
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    controller: Arc<ConcurrencyController>,
    request_timeout: Duration,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        controller: Arc<ConcurrencyController>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            controller,
            request_timeout,
        }
    }

    /// Fetches a URL with the full admission, retry and parsing logic
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 429 | Cool down the host → Skipped |
    /// | HTTP 500/502/503/504 | Retry with backoff → ServerError |
    /// | Timeout / connection failure | Retry with backoff → TransientNetwork |
    /// | Non-HTML content type | Immediate → Skipped |
    /// | Other non-2xx | Immediate → HttpStatus |
    ///
    /// Backoff waits happen without holding any capacity.
    pub async fn fetch(&self, url: Url) -> FetchReport {
        let mut attempts = Vec::new();

        let Some(host) = extract_domain(&url) else {
            return FetchReport {
                url,
                host: String::new(),
                outcome: FetchOutcome::Failed(FetchErrorKind::MissingHost),
                attempts,
            };
        };

        if !self.controller.admit_host(&host) {
            tracing::info!("Skipping external domain: {}", host);
            return FetchReport {
                url,
                outcome: FetchOutcome::Skipped(SkipReason::ExternalDomain(host.clone())),
                host,
                attempts,
            };
        }

        let policy: RetryPolicy = self.controller.retry_policy().clone();
        let mut retries = 0;

        let outcome = loop {
            match self.attempt(&url, &host, &mut attempts).await {
                Attempt::Done(outcome) => break outcome,
                Attempt::Retry(kind) => {
                    if !policy.should_retry(retries) {
                        tracing::warn!(
                            "Giving up on {} after {} attempts: {}",
                            url,
                            attempts.len(),
                            kind
                        );
                        break FetchOutcome::Failed(kind);
                    }
                    let wait = policy.backoff(retries);
                    retries += 1;
                    tracing::debug!(
                        "Retry {}/{} for {} in {:?} ({})",
                        retries,
                        policy.max_retries,
                        url,
                        wait,
                        kind
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        };

        FetchReport {
            url,
            host,
            outcome,
            attempts,
        }
    }

    /// Issues one request while holding capacity
    async fn attempt(&self, url: &Url, host: &str, attempts: &mut Vec<AttemptRecord>) -> Attempt {
        let _permit = match self.controller.acquire(host).await {
            Ok(permit) => permit,
            Err(_) => return Attempt::Done(FetchOutcome::Failed(FetchErrorKind::Closed)),
        };

        let started_at = Utc::now();
        let clock = Instant::now();
        let result = match tokio::time::timeout(
            self.request_timeout,
            self.transport.get(url, self.request_timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        };

        attempts.push(AttemptRecord {
            status: result.as_ref().ok().map(|r| r.status),
            started_at,
            elapsed: clock.elapsed(),
        });

        match result {
            Ok(response) => self.handle_response(url, host, response),
            Err(e) if e.is_transient() => {
                tracing::error!("Network error crawling {}: {}", url, e);
                Attempt::Retry(FetchErrorKind::TransientNetwork(e))
            }
            Err(e) => {
                tracing::error!("Error crawling {}: {}", url, e);
                Attempt::Done(FetchOutcome::Failed(FetchErrorKind::Request(e)))
            }
        }
    }

    fn handle_response(&self, url: &Url, host: &str, response: TransportResponse) -> Attempt {
        let status = response.status;

        if status == 429 {
            let wait = retry_after_delay(response.header("retry-after"), Utc::now());
            self.controller.note_rate_limited(host, wait);
            return Attempt::Done(FetchOutcome::Skipped(SkipReason::RateLimited {
                retry_after: wait,
            }));
        }
        self.controller.note_response(host);

        if RetryPolicy::is_retryable_status(status) {
            return Attempt::Retry(FetchErrorKind::ServerError(status));
        }

        let content_type = response.content_type();
        if !is_allowed_content_type(&content_type) {
            tracing::info!("Skipping non-HTML content: {} ({})", url, content_type);
            return Attempt::Done(FetchOutcome::Skipped(SkipReason::UnsupportedContentType(
                content_type,
            )));
        }

        if !(200..300).contains(&status) {
            return Attempt::Done(FetchOutcome::Failed(FetchErrorKind::HttpStatus(status)));
        }

        let page = parse_document(&response.body, url);
        tracing::info!("Found {} links in {}", page.links.len(), url);
        Attempt::Done(FetchOutcome::Success {
            links: page.links,
            title: page.title,
            byte_size: response.body.len(),
        })
    }
}
