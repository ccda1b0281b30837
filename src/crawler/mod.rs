//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The HTTP transport and its reqwest implementation
//! - Document parsing and link extraction
//! - Admission, throttling and retry policy
//! - The frontier and visited set
//! - Overall crawl coordination

mod controller;
mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod transport;

pub use controller::{
    retry_after_delay, ConcurrencyController, FetchPermit, RetryPolicy, DEFAULT_RATE_LIMIT_WAIT,
    MAX_RATE_LIMIT_WAIT,
};
pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{AttemptRecord, FetchErrorKind, FetchOutcome, FetchReport, Fetcher, SkipReason};
pub use frontier::{Admission, CrawlPolicy, Frontier, FrontierEntry};
pub use parser::{is_allowed_content_type, parse_document, ParsedPage, ALLOWED_CONTENT_TYPES};
pub use transport::{
    build_http_client, ReqwestTransport, Transport, TransportError, TransportResponse,
};
