//! Crawl statistics
//!
//! Workers never touch these counters. The coordinator folds each
//! [`FetchReport`](crate::crawler::FetchReport) into a [`StatsAggregator`] when
//! the fetch completes, and finalizes it into a [`CrawlSummary`] at the end of
//! the run.

mod aggregator;
mod summary;

pub use aggregator::{DomainStats, GlobalStats, StatsAggregator};
pub use summary::{CrawlSummary, DomainSummary};
