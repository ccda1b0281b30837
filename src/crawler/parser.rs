//! Content parser for extracting links and the title
//!
//! Only two kinds of element matter to the crawler: `<a href>` anchors and the
//! `<title>`. HTML, XHTML and XML documents all go through the same lenient
//! parser, so malformed markup degrades to whatever could be recovered rather
//! than failing.

use scraper::{Html, Selector};
use url::Url;

/// Content types the worker hands to the parser
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = [
    "text/html",
    "application/xhtml+xml",
    "application/xml",
    "text/xml",
];

/// Anchor targets that never lead to another page
const SKIPPED_PREFIXES: [&str; 4] = ["#", "javascript:", "mailto:", "tel:"];

/// Extracted information from a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Text of the first `<title>`, trimmed; empty if absent
    pub title: String,

    /// Absolute http(s) targets of every followable anchor, in document order
    pub links: Vec<Url>,
}

/// Whether a `Content-Type` value belongs to the HTML/XHTML/XML family
pub fn is_allowed_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_lowercase();
    ALLOWED_CONTENT_TYPES
        .iter()
        .any(|allowed| content_type.contains(allowed))
}

/// Parses a document and extracts its title and links
///
/// # Link Extraction Rules
///
/// **Include:** every `<a href="...">`, resolved against `base_url`.
///
/// **Exclude:** fragment-only targets and `javascript:`, `mailto:`, `tel:`
/// schemes, unresolvable references, and anything that is not http(s) once
/// resolved.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected.
///
/// # Example
///
/// ```
/// use tide_crawler::crawler::parse_document;
/// use url::Url;
///
/// let html = br#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_document(html, &base_url);
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
/// ```
pub fn parse_document(body: &[u8], base_url: &Url) -> ParsedPage {
    let text = String::from_utf8_lossy(body);
    let document = Html::parse_document(&text);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the page title from the document
fn extract_title(document: &Html) -> String {
    let Ok(title_selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Extracts all followable anchor targets from the document
fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}
