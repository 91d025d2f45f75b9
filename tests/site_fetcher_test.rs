//! Integration tests for HttpSiteFetcher against a local wiremock server

use std::time::Duration;

use serde_json::json;
use siteprobe::domain::models::FetcherConfig;
use siteprobe::domain::ports::{FetchError, SiteFetcher};
use siteprobe::infrastructure::rate_limit::IpRateLimiter;
use siteprobe::infrastructure::scraper::HttpSiteFetcher;
use siteprobe::infrastructure::validators::UrlValidator;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = r##"<!DOCTYPE html>
<html>
<head>
  <title>Example Shop</title>
  <meta name="description" content="Hand-made goods">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <script src="/static/app.min.js"></script>
</head>
<body class="home landing">
  <h1>Welcome</h1>
  <h2>Featured products</h2>
  <a href="/products">Products</a>
  <a href="#top">Top</a>
  <img src="/hero.jpg" alt="Hero">
</body>
</html>"##;

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

/// Fetcher that may reach the loopback mock server.
fn local_fetcher(config: &FetcherConfig) -> HttpSiteFetcher {
    HttpSiteFetcher::with_validator(config, UrlValidator::new().permit_private()).unwrap()
}

#[tokio::test]
async fn test_fetch_extracts_page_facts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header_exists("user-agent"))
        .respond_with(html(PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/", server.uri());
    let content = local_fetcher(&FetcherConfig::default())
        .fetch(&url)
        .await
        .unwrap();

    assert_eq!(content.url, url);
    assert_eq!(content.title, "Example Shop");
    assert_eq!(content.description, "Hand-made goods");
    assert_eq!(content.headings, vec!["H1: Welcome", "H2: Featured products"]);
    assert_eq!(content.links.len(), 1);
    assert_eq!(content.links[0].href, "/products");
    assert_eq!(content.images[0].alt, "Hero");
    assert!(content.performance_hints.has_responsive_meta);
    assert!(content.performance_hints.has_minified_assets);
    assert!(!content.performance_hints.has_ssl);
}

#[tokio::test]
async fn test_stored_markup_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html(PAGE))
        .mount(&server)
        .await;

    let config = FetcherConfig {
        max_html_chars: 40,
        ..FetcherConfig::default()
    };
    let content = local_fetcher(&config).fetch(&server.uri()).await.unwrap();

    assert_eq!(content.html.chars().count(), 40);
    // Extraction still saw the whole document.
    assert_eq!(content.title, "Example Shop");
}

#[tokio::test]
async fn test_non_html_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let err = local_fetcher(&FetcherConfig::default())
        .fetch(&server.uri())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::NotHtml(ref ct) if ct.contains("application/json")));
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = local_fetcher(&FetcherConfig::default())
        .fetch(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();

    assert_eq!(err, FetchError::Http(404));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html(PAGE).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = FetcherConfig {
        timeout_secs: 1,
        ..FetcherConfig::default()
    };
    let err = local_fetcher(&config).fetch(&server.uri()).await.unwrap_err();

    assert_eq!(err, FetchError::Timeout(1));
}

#[tokio::test]
async fn test_per_host_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html(PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = local_fetcher(&FetcherConfig::default())
        .with_rate_limiter(IpRateLimiter::new(1, Duration::from_secs(60)));

    assert!(fetcher.fetch(&server.uri()).await.is_ok());
    let err = fetcher.fetch(&server.uri()).await.unwrap_err();
    assert!(matches!(err, FetchError::RateLimited { retry_after_secs } if retry_after_secs >= 1));
}

#[tokio::test]
async fn test_default_validator_blocks_internal_targets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html(PAGE))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = HttpSiteFetcher::new(&FetcherConfig::default()).unwrap();

    assert!(matches!(
        fetcher.fetch(&server.uri()).await,
        Err(FetchError::Blocked(_))
    ));
    assert!(matches!(
        fetcher.fetch("http://localhost:8080/admin").await,
        Err(FetchError::Blocked(_))
    ));
    assert!(matches!(
        fetcher.fetch("http://169.254.169.254/latest/meta-data").await,
        Err(FetchError::Blocked(_))
    ));
    assert!(matches!(
        fetcher.fetch("ftp://example.com").await,
        Err(FetchError::InvalidUrl(_))
    ));
}

#[tokio::test]
async fn test_redirects_are_followed_on_allowed_hosts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpSiteFetcher::with_validator(
        &FetcherConfig::default(),
        UrlValidator::new().permit_loopback(),
    )
    .unwrap();
    let content = fetcher.fetch(&format!("{}/old", server.uri())).await.unwrap();

    assert_eq!(content.title, "Example Shop");
}

#[tokio::test]
async fn test_redirect_to_internal_address_is_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "http://169.254.169.254/latest/meta-data"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpSiteFetcher::with_validator(
        &FetcherConfig::default(),
        UrlValidator::new().permit_loopback(),
    )
    .unwrap();
    let err = fetcher.fetch(&server.uri()).await.unwrap_err();

    assert_eq!(err, FetchError::Blocked("169.254.169.254".to_string()));
}
