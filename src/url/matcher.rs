use url::Url;

/// Checks a host against the allow-list
///
/// An empty allow-list admits every host. Entries are expected to be
/// lower-cased already; the host is lower-cased here.
///
/// # Examples
///
/// ```
/// use tide_crawler::url::is_allowed_host;
///
/// let allowed = vec!["example.com".to_string()];
/// assert!(is_allowed_host(&allowed, "EXAMPLE.com"));
/// assert!(!is_allowed_host(&allowed, "blog.example.com"));
/// assert!(is_allowed_host(&[], "anything.org"));
/// ```
pub fn is_allowed_host(allowed: &[String], host: &str) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let host = host.to_lowercase();
    allowed.iter().any(|entry| *entry == host)
}

/// Checks whether the URL path ends with one of the blacklisted extensions
///
/// Extensions are expected in `.ext` lower-case form. Only the path takes
/// part: `/image.png?size=2` matches `.png`.
pub fn has_blacklisted_extension(url: &Url, blacklist: &[String]) -> bool {
    if blacklist.is_empty() {
        return false;
    }
    let path = url.path().to_lowercase();
    blacklist.iter().any(|ext| path.ends_with(ext.as_str()))
}
