use serde::Serialize;
use std::collections::BTreeMap;

/// Final statistics of one host
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomainSummary {
    /// Seconds between the first and the last request
    pub total_time_to_crawl: f64,
    pub total_number_of_crawled_urls: u64,
    pub total_number_of_errors: u64,
    pub total_number_of_requests: u64,
    pub status_code_statistics: BTreeMap<u16, u64>,
}

/// Final statistics of a run, as handed to the reporting layer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrawlSummary {
    /// Wall-clock seconds for the whole run
    pub total_time_of_script: f64,
    pub total_number_of_urls_crawled: u64,
    pub total_number_of_errors: u64,
    pub total_number_of_domains: usize,
    pub crawl_rate_per_second: f64,
    pub status_code_statistics: BTreeMap<u16, u64>,
    pub domain_statistics: BTreeMap<String, DomainSummary>,

    /// Successfully crawled URLs, in completion order
    #[serde(skip)]
    pub crawled_urls: Vec<String>,
}

impl CrawlSummary {
    /// Copy with every float rounded to two decimals
    pub fn rounded(&self) -> Self {
        let mut summary = self.clone();
        summary.total_time_of_script = round2(summary.total_time_of_script);
        summary.crawl_rate_per_second = round2(summary.crawl_rate_per_second);
        for domain in summary.domain_statistics.values_mut() {
            domain.total_time_to_crawl = round2(domain.total_time_to_crawl);
        }
        summary
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
