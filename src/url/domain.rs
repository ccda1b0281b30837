use url::Url;

/// Extracts the host from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// The port is not part of the result.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use tide_crawler::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8080/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Approximates the registrable domain of a host: its last two labels
///
/// This is a naive split. Multi-part public suffixes are not recognized, so
/// `shop.example.co.uk` yields `co.uk` and every `.co.uk` site shares it.
///
/// # Examples
///
/// ```
/// use tide_crawler::url::base_domain;
///
/// assert_eq!(base_domain("docs.python.org"), "python.org");
/// assert_eq!(base_domain("localhost"), "localhost");
/// ```
pub fn base_domain(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    let start = labels.len().saturating_sub(2);
    labels[start..].join(".")
}
