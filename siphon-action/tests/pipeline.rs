mod common;

use async_trait::async_trait;
use siphon_action::{InvocationEvent, ScrapeHandler};
use siphon_common::{ErrorKind, Result, ScrapeError};
use siphon_config::SiphonConfig;
use siphon_http::{PageFetcher, RawResponse};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves one canned page for every URL and records what was asked for.
struct CannedFetcher {
    html: &'static str,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl CannedFetcher {
    fn new(html: &'static str) -> Self {
        Self {
            html,
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for CannedFetcher {
    async fn fetch(&self, url: &Url) -> Result<RawResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(url.to_string());
        Ok(RawResponse {
            status: 200,
            headers: BTreeMap::new(),
            body: self.html.as_bytes().to_vec(),
            final_url: url.clone(),
        })
    }
}

struct FailingFetcher(ScrapeError);

#[async_trait]
impl PageFetcher for FailingFetcher {
    async fn fetch(&self, _url: &Url) -> Result<RawResponse> {
        Err(self.0.clone())
    }
}

struct PanickingFetcher;

#[async_trait]
impl PageFetcher for PanickingFetcher {
    async fn fetch(&self, _url: &Url) -> Result<RawResponse> {
        panic!("fetcher exploded");
    }
}

fn handler<F: PageFetcher>(fetcher: F) -> ScrapeHandler<F> {
    common::init_test_tracing();
    ScrapeHandler::with_fetcher(SiphonConfig::default(), fetcher)
}

#[tokio::test]
async fn example_page_end_to_end_with_canned_fetcher() {
    let h = handler(CannedFetcher::new("<title>Example</title><p>Hi</p>"));

    let env = h
        .handle(&InvocationEvent::for_url("https://example.com"))
        .await
        .unwrap();
    let text = env.text().unwrap();

    assert_eq!(env.status_code, 200);
    assert!(text.contains("Successfully scraped: Example"));
    assert!(text.contains("https://example.com"));
    assert!(text.contains("Hi"));
}

#[tokio::test]
async fn example_page_end_to_end_against_mock_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<title>Example</title><p>Hi</p>", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    common::init_test_tracing();
    let h = ScrapeHandler::from_config(SiphonConfig::default()).unwrap();
    let site = format!("{}/", server.uri());
    let event: InvocationEvent =
        serde_json::from_value(serde_json::json!({ "requestBody": { "url": site } })).unwrap();

    let env = h.handle(&event).await.unwrap();
    let text = env.text().unwrap();

    assert_eq!(env.status_code, 200);
    assert!(text.contains("Successfully scraped: Example"), "{text}");
    assert!(text.contains(&format!("URL: {site}")));
    assert!(text.contains("Hi"));
}

#[tokio::test]
async fn invalid_url_short_circuits_without_network() {
    let fetcher = CannedFetcher::new("<p>unused</p>");
    let h = handler(fetcher);

    let env = h
        .handle(&InvocationEvent::for_url("example.com/no-scheme"))
        .await
        .unwrap();

    assert_eq!(env.status_code, 200);
    assert_eq!(
        env.text().as_deref(),
        Some("Error: Invalid URL format: example.com/no-scheme")
    );

    let run = h.run(&InvocationEvent::for_url("https://")).await;
    assert_eq!(run.outcome.unwrap_err().kind(), ErrorKind::InvalidUrl);
}

#[tokio::test]
async fn network_counter_stays_at_zero_for_rejected_input() {
    let fetcher = CannedFetcher::new("<p>unused</p>");
    let h = ScrapeHandler::with_fetcher(SiphonConfig::default(), &fetcher);

    h.handle(&InvocationEvent::for_url("ftp://example.com/file")).await.unwrap();
    h.handle(&InvocationEvent::for_text("no link in here")).await.unwrap();
    h.handle(&InvocationEvent::default()).await.unwrap();

    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn missing_url_reports_the_resolver_message() {
    let h = handler(CannedFetcher::new("<p>unused</p>"));

    let env = h.handle(&InvocationEvent::for_text("hello")).await.unwrap();

    assert_eq!(
        env.text().as_deref(),
        Some("Error: No valid URL provided. Please provide a URL to scrape.")
    );
}

#[tokio::test]
async fn structured_url_is_preferred_over_text() {
    let fetcher = CannedFetcher::new("<title>S</title>");
    let h = ScrapeHandler::with_fetcher(SiphonConfig::default(), &fetcher);
    let event = InvocationEvent {
        input_text: Some("ignore https://text.example/".into()),
        ..InvocationEvent::for_url("https://structured.example/")
    };

    h.handle(&event).await.unwrap();

    assert_eq!(
        *fetcher.requested.lock().unwrap(),
        vec!["https://structured.example/".to_string()]
    );
}

#[tokio::test]
async fn url_is_found_in_free_text() {
    let fetcher = CannedFetcher::new("<title>From text</title><p>body</p>");
    let h = ScrapeHandler::with_fetcher(SiphonConfig::default(), &fetcher);

    let run = h
        .run(&InvocationEvent::for_text(
            "Can you summarise https://blog.example/post-1 for me?",
        ))
        .await;

    assert_eq!(run.url.as_deref(), Some("https://blog.example/post-1"));
    assert_eq!(run.outcome.unwrap().title, "From text");
}

#[tokio::test]
async fn fetch_failures_are_wrapped_not_raised() {
    let h = handler(FailingFetcher(ScrapeError::Timeout { secs: 30 }));

    let env = h
        .handle(&InvocationEvent::for_url("https://slow.example"))
        .await
        .unwrap();

    assert_eq!(env.status_code, 200);
    assert_eq!(
        env.text().as_deref(),
        Some("Failed to scrape website: Request timeout after 30 seconds")
    );
}

#[tokio::test]
async fn server_error_status_is_reported_in_text() {
    let server = MockServer::start().await;
    Mock::given(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    common::init_test_tracing();
    let h = ScrapeHandler::from_config(SiphonConfig::default()).unwrap();
    let env = h
        .handle(&InvocationEvent::for_url(format!("{}/down", server.uri())))
        .await
        .unwrap();

    assert_eq!(env.status_code, 200);
    assert_eq!(
        env.text().as_deref(),
        Some("Failed to scrape website: Request failed: HTTP 500 Internal Server Error")
    );
}

#[tokio::test]
async fn long_pages_are_truncated_and_length_reported() {
    let fetcher = CannedFetcher::new(
        "<title>Long</title><p>abcdefghijklmnopqrstuvwxyzabcdefghijklmnopqrstuvwxyz</p>",
    );
    let config = SiphonConfig {
        max_text_length: 10,
        ..SiphonConfig::default()
    };
    let h = ScrapeHandler::with_fetcher(config, fetcher);

    let run = h.run(&InvocationEvent::for_url("https://long.example")).await;
    let content = run.outcome.unwrap();

    // Title text comes first in document order.
    assert_eq!(content.text, "Longabcdef... [content truncated]");
    assert_eq!(content.text_length, 33);

    let env = h
        .handle(&InvocationEvent::for_url("https://long.example"))
        .await
        .unwrap();
    assert!(env.text().unwrap().contains("Content length: 33 characters"));
}

#[tokio::test]
async fn panics_become_an_error_envelope() {
    let h = handler(PanickingFetcher);

    let env = h
        .handle(&InvocationEvent::for_url("https://boom.example"))
        .await
        .unwrap();

    assert_eq!(env.status_code, 200);
    assert_eq!(
        env.text().as_deref(),
        Some("Error: Error scraping website: fetcher exploded")
    );
}

#[tokio::test]
async fn route_is_echoed_from_the_event() {
    let h = handler(CannedFetcher::new("<title>R</title>"));
    let event = InvocationEvent {
        action_group: Some("web-scrape-action-group".into()),
        ..InvocationEvent::for_url("https://route.example")
    };

    let env = h.handle(&event).await.unwrap();
    let body = env.decode_body().unwrap();

    assert_eq!(body.response.action_group, "web-scrape-action-group");
    assert_eq!(body.response.function, "scrape_website");
}

#[tokio::test]
async fn report_mirrors_the_outcome() {
    let h = handler(FailingFetcher(ScrapeError::RequestFailed("dns error".into())));

    let report = h
        .run(&InvocationEvent::for_url("https://unreachable.example"))
        .await
        .report();

    assert!(!report.success);
    assert_eq!(report.url.as_deref(), Some("https://unreachable.example"));
    assert_eq!(report.error.as_deref(), Some("Request failed: dns error"));
    assert!(report.text.is_none());
}

#[tokio::test]
async fn report_survives_a_panicking_pipeline() {
    let h = handler(PanickingFetcher);

    let report = h.report(&InvocationEvent::for_url("https://boom.example")).await;

    assert!(!report.success);
    assert_eq!(
        report.error.as_deref(),
        Some("Error scraping website: fetcher exploded")
    );
    assert!(report.error_kind.is_none());
}

#[tokio::test]
async fn report_matches_run_when_nothing_panics() {
    let fetcher = CannedFetcher::new("<title>Same</title><p>both ways</p>");
    let h = ScrapeHandler::with_fetcher(SiphonConfig::default(), &fetcher);
    let event = InvocationEvent::for_url("https://same.example");

    let via_report = h.report(&event).await;
    let via_run = h.run(&event).await.report();

    assert_eq!(via_report, via_run);
    assert_eq!(via_report.title.as_deref(), Some("Same"));
}
