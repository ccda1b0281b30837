//! Integration tests for the crawler
//!
//! Most tests drive the coordinator over an in-memory site that records every
//! request it receives, which makes concurrency, retry and rate-limit behavior
//! observable. The wiremock tests run the full cycle over real HTTP.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tide_crawler::config::CrawlConfig;
use tide_crawler::crawler::{Coordinator, Transport, TransportError, TransportResponse};
use tide_crawler::output::write_json_report;
use tide_crawler::CrawlError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// What the in-memory site answers for a URL
#[derive(Clone)]
enum Reply {
    Html(String),
    Status(u16),
    TooManyRequests(Option<&'static str>),
    ContentType(&'static str),
    Hang,
}

fn html(body: &str) -> Reply {
    Reply::Html(body.to_string())
}

/// In-memory site that records traffic
///
/// Each URL has a script of replies; the last one repeats. Unknown URLs get
/// a 404.
#[derive(Default)]
struct MockSite {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    delay: Duration,
    requests: Mutex<Vec<(String, Instant)>>,
    in_flight: Mutex<HashMap<String, usize>>,
    global_in_flight: AtomicUsize,
    max_global: AtomicUsize,
    max_per_host: AtomicUsize,
}

impl MockSite {
    fn new() -> Self {
        Self::default()
    }

    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn route(self, url: &str, replies: Vec<Reply>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into());
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    fn request_times(&self, url: &str) -> Vec<Instant> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, at)| *at)
            .collect()
    }

    fn next_reply(&self, url: &str) -> Reply {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(url) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap(),
            Some(script) => script.front().cloned().unwrap_or(Reply::Status(404)),
            None => Reply::Status(404),
        }
    }
}

/// Decrements the in-flight counters even when the request is aborted
struct InFlightGuard<'a> {
    site: &'a MockSite,
    host: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.site.global_in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(count) = self.site.in_flight.lock().unwrap().get_mut(&self.host) {
            *count -= 1;
        }
    }
}

#[async_trait]
impl Transport for MockSite {
    async fn get(&self, url: &Url, _timeout: Duration) -> Result<TransportResponse, TransportError> {
        let host = url.host_str().unwrap_or_default().to_string();
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));

        let global = self.global_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_global.fetch_max(global, Ordering::SeqCst);
        let per_host = {
            let mut in_flight = self.in_flight.lock().unwrap();
            let count = in_flight.entry(host.clone()).or_insert(0);
            *count += 1;
            *count
        };
        self.max_per_host.fetch_max(per_host, Ordering::SeqCst);
        let _guard = InFlightGuard { site: self, host };

        let reply = self.next_reply(url.as_str());
        if matches!(reply, Reply::Hang) {
            std::future::pending::<()>().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut headers = HeaderMap::new();
        let (status, body) = match reply {
            Reply::Html(body) => {
                headers.insert("content-type", HeaderValue::from_static("text/html; charset=utf-8"));
                (200, body.into_bytes())
            }
            Reply::Status(status) => {
                headers.insert("content-type", HeaderValue::from_static("text/html"));
                (status, Vec::new())
            }
            Reply::TooManyRequests(retry_after) => {
                if let Some(value) = retry_after {
                    headers.insert("retry-after", HeaderValue::from_static(value));
                }
                (429, Vec::new())
            }
            Reply::ContentType(content_type) => {
                headers.insert("content-type", HeaderValue::from_static(content_type));
                (200, b"binary".to_vec())
            }
            Reply::Hang => unreachable!(),
        };

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn sorted(mut urls: Vec<String>) -> Vec<String> {
    urls.sort();
    urls
}

async fn crawl(config: CrawlConfig, site: Arc<MockSite>) -> tide_crawler::CrawlSummary {
    Coordinator::with_transport(config, site)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed")
}

#[tokio::test]
async fn test_allowed_domains_end_to_end() {
    let site = Arc::new(MockSite::new().route(
        "https://a.test/",
        vec![html(r#"<a href="https://a.test/p1">1</a><a href="https://b.test/p2">2</a>"#)],
    ).route("https://a.test/p1", vec![html("<title>P1</title>")]));

    let config = CrawlConfig::new("https://a.test/", 1).with_allowed_domains(["a.test"]);
    let summary = crawl(config, site.clone()).await;

    assert_eq!(
        sorted(summary.crawled_urls.clone()),
        vec!["https://a.test/", "https://a.test/p1"]
    );
    assert!(!site.requested().iter().any(|u| u.contains("b.test")));
    assert_eq!(summary.total_number_of_errors, 0);
    assert_eq!(summary.total_number_of_domains, 1);
}

#[tokio::test]
async fn test_blacklisted_extension_never_fetched() {
    let site = Arc::new(MockSite::new().route(
        "https://shop.test/",
        vec![html(r#"<a href="/logo.png">logo</a><a href="/LOGO2.PNG">logo</a><a href="/about">about</a>"#)],
    ).route("https://shop.test/about", vec![html("about")]));

    let config = CrawlConfig::new("https://shop.test/", 3).with_blacklist_extensions(["png"]);
    let summary = crawl(config, site.clone()).await;

    assert_eq!(summary.total_number_of_urls_crawled, 2);
    assert!(!site
        .requested()
        .iter()
        .any(|u| u.to_lowercase().ends_with(".png")));
}

#[tokio::test]
async fn test_depth_limit_and_single_dispatch() {
    let site = Arc::new(
        MockSite::new()
            .route("https://deep.test/", vec![html(r#"<a href="/d1">1</a><a href="/d1#again">1</a>"#)])
            .route("https://deep.test/d1", vec![html(r#"<a href="/d2">2</a><a href="/">home</a>"#)])
            .route("https://deep.test/d2", vec![html(r#"<a href="/d3">3</a><a href="/d1">1</a>"#)])
            .route("https://deep.test/d3", vec![html("bottom")]),
    );

    let config = CrawlConfig::new("https://deep.test/", 2);
    let summary = crawl(config, site.clone()).await;

    assert_eq!(
        sorted(summary.crawled_urls.clone()),
        vec!["https://deep.test/", "https://deep.test/d1", "https://deep.test/d2"]
    );

    let requested = site.requested();
    assert!(!requested.contains(&"https://deep.test/d3".to_string()));
    for url in &requested {
        assert_eq!(
            requested.iter().filter(|u| *u == url).count(),
            1,
            "{} dispatched more than once",
            url
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_delays_next_dispatch() {
    let site = Arc::new(
        MockSite::new()
            .route(
                "https://busy.test/",
                vec![html(r#"<a href="/limited">l</a><a href="/after">a</a>"#)],
            )
            .route("https://busy.test/limited", vec![Reply::TooManyRequests(Some("5"))])
            .route("https://busy.test/after", vec![html("after")]),
    );

    let config = CrawlConfig::new("https://busy.test/", 1).with_concurrency_limit(1);
    let summary = crawl(config, site.clone()).await;

    let limited = site.request_times("https://busy.test/limited");
    let after = site.request_times("https://busy.test/after");
    assert_eq!(limited.len(), 1, "429 must not be retried");
    assert_eq!(after.len(), 1);
    assert!(after[0].duration_since(limited[0]) >= Duration::from_secs(5));

    assert_eq!(summary.total_number_of_errors, 0);
    assert_eq!(summary.total_number_of_urls_crawled, 2);
    assert_eq!(summary.status_code_statistics.get(&429), Some(&1));
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_retried_until_success() {
    let site = Arc::new(MockSite::new().route(
        "https://flaky.test/",
        vec![
            Reply::Status(503),
            Reply::Status(503),
            Reply::Status(503),
            html("<title>finally</title>"),
        ],
    ));

    let config = CrawlConfig::new("https://flaky.test/", 0).with_max_retries(3);
    let summary = crawl(config, site.clone()).await;

    assert_eq!(summary.total_number_of_urls_crawled, 1);
    assert_eq!(summary.total_number_of_errors, 0);
    assert_eq!(summary.status_code_statistics.get(&503), Some(&3));
    assert_eq!(summary.status_code_statistics.get(&200), Some(&1));
    assert_eq!(site.requested().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_count_one_error() {
    let site = Arc::new(MockSite::new().route("https://down.test/", vec![Reply::Status(502)]));

    let config = CrawlConfig::new("https://down.test/", 0).with_max_retries(2);
    let summary = crawl(config, site.clone()).await;

    assert_eq!(summary.total_number_of_urls_crawled, 0);
    assert_eq!(summary.total_number_of_errors, 1);
    assert_eq!(site.requested().len(), 3);
    assert_eq!(
        summary.domain_statistics["down.test"].total_number_of_requests,
        3
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_limits_respected() {
    let mut links = String::new();
    for host in ["a.fan.test", "b.fan.test", "c.fan.test"] {
        for page in 0..4 {
            links.push_str(&format!(r#"<a href="https://{}/{}">x</a>"#, host, page));
        }
    }

    let mut site = MockSite::with_delay(Duration::from_millis(100))
        .route("https://fan.test/", vec![html(&links)]);
    for host in ["a.fan.test", "b.fan.test", "c.fan.test"] {
        for page in 0..4 {
            site = site.route(&format!("https://{}/{}", host, page), vec![html("leaf")]);
        }
    }
    let site = Arc::new(site);

    let config = CrawlConfig::new("https://fan.test/", 1).with_concurrency_limit(3);
    let summary = crawl(config, site.clone()).await;

    assert_eq!(summary.total_number_of_urls_crawled, 13);
    assert!(site.max_global.load(Ordering::SeqCst) <= 3);
    assert!(site.max_global.load(Ordering::SeqCst) >= 2);
    assert!(site.max_per_host.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_unsupported_content_is_skipped() {
    let site = Arc::new(
        MockSite::new()
            .route(
                "https://mixed.test/",
                vec![html(r#"<a href="/data">d</a><a href="/feed">f</a>"#)],
            )
            .route("https://mixed.test/data", vec![Reply::ContentType("application/json")])
            .route(
                "https://mixed.test/feed",
                vec![Reply::ContentType("application/rss+xml")],
            ),
    );

    let config = CrawlConfig::new("https://mixed.test/", 1);
    let summary = crawl(config, site.clone()).await;

    assert_eq!(summary.total_number_of_urls_crawled, 1);
    assert_eq!(summary.total_number_of_errors, 0);
    assert_eq!(site.requested().len(), 3);
}

#[tokio::test]
async fn test_cancellation_releases_capacity() {
    let mut links = String::new();
    for page in 0..6 {
        links.push_str(&format!(r#"<a href="/slow/{}">x</a>"#, page));
    }
    let mut site = MockSite::new().route("https://stuck.test/", vec![html(&links)]);
    for page in 0..6 {
        site = site.route(&format!("https://stuck.test/slow/{}", page), vec![Reply::Hang]);
    }
    let site = Arc::new(site);

    let config = CrawlConfig::new("https://stuck.test/", 1).with_concurrency_limit(4);
    let coordinator = Coordinator::with_transport(config, site.clone()).unwrap();
    let controller = coordinator.controller();
    let initial = controller.available_permits();

    let token = CancellationToken::new();
    let run = tokio::spawn(coordinator.run_with_cancellation(token.clone()));

    tokio::time::timeout(Duration::from_secs(5), async {
        while site.requested().len() < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("fetches never started");
    assert!(controller.available_permits() < initial);

    token.cancel();
    let result = run.await.unwrap();
    assert!(matches!(result, Err(CrawlError::Cancelled)));

    assert_eq!(controller.available_permits(), initial);
    assert_eq!(controller.available_permits(), controller.global_limit());
    assert_eq!(controller.host_available_permits("stuck.test"), Some(2));
    assert_eq!(site.global_in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(
                r#"<html><head><title>Home</title></head><body>
                <a href="{}/page1">Page 1</a>
                <a href="/page2">Page 2</a>
                <a href="/missing">Missing</a>
                <a href="/image.png">Image</a>
                <a href="mailto:someone@example.com">Mail</a>
                </body></html>"#,
                base_url
            ),
            "text/html",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><head><title>Page 1</title></head><body><a href="/">Home</a></body></html>"#,
            "text/html",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<?xml version="1.0"?><page><title>Page 2</title></page>"#,
            "application/xml",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_raw("not here", "text/html"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/image.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 16], "image/png"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = CrawlConfig::new(format!("{}/", base_url), 2).with_blacklist_extensions([".PNG"]);
    let summary = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(
        sorted(summary.crawled_urls.clone()),
        sorted(vec![
            format!("{}/", base_url),
            format!("{}/page1", base_url),
            format!("{}/page2", base_url),
        ])
    );
    assert_eq!(summary.total_number_of_urls_crawled, 3);
    assert_eq!(summary.total_number_of_errors, 1);
    assert_eq!(summary.status_code_statistics.get(&404), Some(&1));
    assert_eq!(summary.total_number_of_domains, 1);
}

#[tokio::test]
async fn test_rate_limited_over_http_is_not_an_error() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<a href="/limited">limited</a>"#,
            "text/html",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = CrawlConfig::new(format!("{}/", base_url), 1);
    let summary = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.total_number_of_urls_crawled, 1);
    assert_eq!(summary.total_number_of_errors, 0);
    assert_eq!(summary.status_code_statistics.get(&429), Some(&1));
}

#[tokio::test]
async fn test_report_written_after_crawl() {
    let site = Arc::new(MockSite::new().route("https://report.test/", vec![html("<title>r</title>")]));
    let summary = crawl(CrawlConfig::new("https://report.test/", 0), site).await;

    let temp_dir = tempfile::TempDir::new().unwrap();
    let report = temp_dir.path().join("results.json");
    write_json_report(&summary, Some(&report)).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["total_number_of_urls_crawled"], 1);
    assert_eq!(json["total_number_of_domains"], 1);
    assert_eq!(
        json["domain_statistics"]["report.test"]["status_code_statistics"]["200"],
        1
    );
}
