use serde::Deserialize;
use std::time::Duration;

/// Default number of concurrent fetches across all domains
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 10;

/// Default number of retries for transient failures
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default per-request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// Maximum concurrent fetches against a single host
pub const MAX_CONCURRENT_PER_DOMAIN: usize = 2;

/// Main configuration structure for a crawl run
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Absolute http(s) URL the crawl starts from
    pub seed: String,

    /// Maximum link depth from the seed (the seed is depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Hosts that may be fetched; empty means every host
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,

    /// Path extensions that are never enqueued (e.g. ".png")
    #[serde(rename = "blacklist-extensions", default)]
    pub blacklist_extensions: Vec<String>,

    /// Maximum number of concurrent fetches across all domains
    #[serde(rename = "concurrency-limit", default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Maximum number of retries for transient failures
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// Optional URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

/// Report output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path of the JSON report; a timestamped name is used when absent
    #[serde(rename = "report-path", default)]
    pub report_path: Option<String>,
}

fn default_concurrency_limit() -> usize {
    DEFAULT_CONCURRENCY_LIMIT
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "TideCrawler".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    ///
    /// Format: `Mozilla/5.0 (compatible; Name/Version[; +ContactURL])`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "Mozilla/5.0 (compatible; {}/{}; +{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!(
                "Mozilla/5.0 (compatible; {}/{})",
                self.crawler_name, self.crawler_version
            ),
        }
    }
}

impl CrawlConfig {
    /// Creates a configuration with default limits for the given seed
    pub fn new(seed: impl Into<String>, max_depth: u32) -> Self {
        Self {
            crawler: CrawlerConfig {
                seed: seed.into(),
                max_depth,
                allowed_domains: Vec::new(),
                blacklist_extensions: Vec::new(),
                concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
                max_retries: DEFAULT_MAX_RETRIES,
                request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            },
            user_agent: UserAgentConfig::default(),
            output: OutputConfig::default(),
        }
    }

    pub fn with_allowed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.crawler.allowed_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_blacklist_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.crawler.blacklist_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.crawler.concurrency_limit = limit;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.crawler.max_retries = retries;
        self
    }

    pub fn with_report_path(mut self, path: impl Into<String>) -> Self {
        self.output.report_path = Some(path.into());
        self
    }

    /// Per-request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.crawler.request_timeout_secs)
    }
}
