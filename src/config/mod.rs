//! Configuration module for the crawler
//!
//! This module handles loading, parsing, normalizing and validating crawl
//! configuration, whether it comes from a TOML file or is built in code.
//!
//! # Example
//!
//! ```no_run
//! use tide_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CrawlConfig, CrawlerConfig, OutputConfig, UserAgentConfig, DEFAULT_CONCURRENCY_LIMIT,
    DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT_SECS, MAX_CONCURRENT_PER_DOMAIN,
};

// Re-export parser functions
pub use parser::{load_config, parse_config, prepare};
pub use validation::normalize_extension;
