//! Tide: a polite, bounded breadth-first site crawler
//!
//! This crate crawls a site (or a set of allowed domains) breadth-first from a
//! seed URL, bounded by depth, a domain allow-list and an extension blacklist,
//! while respecting global and per-domain concurrency limits, backing off on
//! rate-limit signals and aggregating per-domain statistics.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod stats;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
///
/// Failures of individual URLs never surface here: they are recorded as
/// [`crawler::FetchOutcome::Failed`] and counted in the statistics.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Crawl was cancelled")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::CrawlConfig;
pub use crawler::{Coordinator, FetchOutcome};
pub use stats::CrawlSummary;
pub use crate::url::{base_domain, extract_domain, normalize_url};
