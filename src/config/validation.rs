use crate::config::types::{CrawlConfig, CrawlerConfig, UserAgentConfig};
use crate::url::normalize_url;
use crate::ConfigError;

/// Upper bound on the global concurrency limit
const MAX_CONCURRENCY_LIMIT: usize = 100;

/// Upper bound on the retry count
const MAX_RETRIES: u32 = 10;

/// Brings user-supplied values into canonical form
///
/// - the seed has its fragment stripped
/// - allowed domains are trimmed and lower-cased
/// - blacklist extensions are lower-cased and carry exactly one leading dot
///
/// Empty entries are dropped. Applying it twice yields the same config.
pub fn normalize(mut config: CrawlConfig) -> Result<CrawlConfig, ConfigError> {
    let seed = normalize_url(config.crawler.seed.trim())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL: {}", e)))?;
    config.crawler.seed = seed.to_string();

    config.crawler.allowed_domains = config
        .crawler
        .allowed_domains
        .iter()
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .collect();

    config.crawler.blacklist_extensions = config
        .crawler
        .blacklist_extensions
        .iter()
        .map(|ext| normalize_extension(ext))
        .filter(|ext| ext.len() > 1)
        .collect();

    Ok(config)
}

/// Normalizes an extension to `.ext` lower-case form
pub fn normalize_extension(ext: &str) -> String {
    format!(".{}", ext.trim().trim_start_matches('.').to_lowercase())
}

/// Validates the entire configuration
pub fn validate(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    normalize_url(&config.seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", config.seed, e)))?;

    if config.concurrency_limit < 1 || config.concurrency_limit > MAX_CONCURRENCY_LIMIT {
        return Err(ConfigError::Validation(format!(
            "concurrency_limit must be between 1 and {}, got {}",
            MAX_CONCURRENCY_LIMIT, config.concurrency_limit
        )));
    }

    if config.max_retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= {}, got {}",
            MAX_RETRIES, config.max_retries
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout must be at least 1 second".to_string(),
        ));
    }

    for domain in &config.allowed_domains {
        validate_domain_string(domain)?;
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.crawler_name
        )));
    }

    Ok(())
}

/// Validates an allowed host entry
///
/// The allow-list is matched against the bare host, so entries carry no port.
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Allowed domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
        return Err(ConfigError::Validation(format!(
            "Allowed domain '{}' is malformed",
            domain
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("png"), ".png");
        assert_eq!(normalize_extension(".PNG"), ".png");
        assert_eq!(normalize_extension("  ..Jpg "), ".jpg");
    }

    #[test]
    fn test_normalize_config() {
        let config = CrawlConfig::new("https://Example.com/start#top", 2)
            .with_allowed_domains([" Example.COM ", ""])
            .with_blacklist_extensions(["png", ".CSS", "."]);

        let config = normalize(config).unwrap();
        assert_eq!(config.crawler.seed, "https://example.com/start");
        assert_eq!(config.crawler.allowed_domains, vec!["example.com"]);
        assert_eq!(config.crawler.blacklist_extensions, vec![".png", ".css"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let config = CrawlConfig::new("https://example.com/", 1)
            .with_blacklist_extensions(["pdf"]);
        let once = normalize(config).unwrap();
        let twice = normalize(once.clone()).unwrap();
        assert_eq!(once.crawler.seed, twice.crawler.seed);
        assert_eq!(
            once.crawler.blacklist_extensions,
            twice.crawler.blacklist_extensions
        );
    }

    #[test]
    fn test_validate_defaults() {
        let config = CrawlConfig::new("https://example.com/", 1);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_seed() {
        assert!(validate(&CrawlConfig::new("ftp://example.com/", 1)).is_err());
        assert!(validate(&CrawlConfig::new("not a url", 1)).is_err());
    }

    #[test]
    fn test_validate_concurrency_bounds() {
        let zero = CrawlConfig::new("https://example.com/", 1).with_concurrency_limit(0);
        assert!(matches!(validate(&zero), Err(ConfigError::Validation(_))));

        let huge = CrawlConfig::new("https://example.com/", 1).with_concurrency_limit(1000);
        assert!(validate(&huge).is_err());
    }

    #[test]
    fn test_validate_retry_bound() {
        let config = CrawlConfig::new("https://example.com/", 1).with_max_retries(11);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_domain_string() {
        assert!(validate_domain_string("example.com").is_ok());
        assert!(validate_domain_string("a.test").is_ok());
        assert!(validate_domain_string("localhost").is_ok());

        assert!(validate_domain_string(".example.com").is_err());
        assert!(validate_domain_string("example..com").is_err());
        assert!(validate_domain_string("exa mple.com").is_err());
    }

    #[test]
    fn test_validate_crawler_name() {
        let mut config = CrawlConfig::new("https://example.com/", 1);
        config.user_agent.crawler_name = String::new();
        assert!(validate(&config).is_err());

        config.user_agent.crawler_name = "bad name".to_string();
        assert!(validate(&config).is_err());
    }
}
