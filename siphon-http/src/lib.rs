//! Bounded page fetcher: one GET, hard limits, no retries.
//!
//! - Browser-like request headers so trivial bot filters let us through
//! - Redirects followed; the final URL is reported
//! - Whole-exchange timeout (connect, headers and body)
//! - Size limit enforced on the declared `Content-Length` *and* on the
//!   streamed body, chunk by chunk
//! - `gzip`/`deflate` transport decoding done here, with its own error
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> siphon_common::Result<()> {
//! use siphon_http::{BoundedFetcher, FetchLimits, PageFetcher};
//! use std::time::Duration;
//!
//! let fetcher = BoundedFetcher::new(FetchLimits::new(1024 * 1024, Duration::from_secs(30)))?;
//! let url = url::Url::parse("https://example.com").unwrap();
//! let raw = fetcher.fetch(&url).await?;
//! println!("{} bytes from {}", raw.body.len(), raw.final_url);
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for fetch start,
//! response headers, completion and failures. Query parameters that look like
//! secrets are redacted before they reach a log line.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION, CONTENT_ENCODING, CONTENT_LENGTH,
    HeaderMap, HeaderValue, UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use reqwest::{Client, redirect};
use siphon_common::{Result, ScrapeError, SizeLimit};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use url::Url;

mod body;

pub use body::{decode_transport, read_bounded};

const MAX_REDIRECTS: usize = 10;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

// ==============================
// Limits & response
// ==============================

/// Resource bounds applied to every fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchLimits {
    /// Maximum body size in bytes, before and after decompression.
    pub max_content_size: usize,
    /// Budget for the whole exchange.
    pub timeout: Duration,
}

impl FetchLimits {
    pub fn new(max_content_size: usize, timeout: Duration) -> Self {
        Self {
            max_content_size,
            timeout,
        }
    }

    fn timeout_error(&self) -> ScrapeError {
        ScrapeError::Timeout {
            secs: self.timeout.as_secs(),
        }
    }
}

/// What came back from the server, already transport-decoded.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    /// Lower-cased header names; repeated headers are joined with `", "`.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    /// Location after redirects.
    pub final_url: Url,
}

// ==============================
// Fetcher seam
// ==============================

/// Retrieves a single page. The pipeline depends only on this trait.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<RawResponse>;
}

#[async_trait]
impl<'a, T: PageFetcher + ?Sized> PageFetcher for &'a T {
    async fn fetch(&self, url: &Url) -> Result<RawResponse> {
        (**self).fetch(url).await
    }
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for std::sync::Arc<T> {
    async fn fetch(&self, url: &Url) -> Result<RawResponse> {
        (**self).fetch(url).await
    }
}

#[derive(Clone)]
pub struct BoundedFetcher {
    inner: Client,
    limits: FetchLimits,
}

impl BoundedFetcher {
    /// Build a fetcher with browser headers and the given limits.
    ///
    /// ```no_run
    /// use siphon_http::{BoundedFetcher, FetchLimits};
    /// use std::time::Duration;
    ///
    /// let fetcher = BoundedFetcher::new(FetchLimits::new(4096, Duration::from_secs(2)))?;
    /// assert_eq!(fetcher.limits().max_content_size, 4096);
    /// # Ok::<(), siphon_common::ScrapeError>(())
    /// ```
    pub fn new(limits: FetchLimits) -> Result<Self> {
        let inner = Client::builder()
            .default_headers(browser_headers())
            .timeout(limits.timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| ScrapeError::RequestFailed(format!("client build failed: {e}")))?;
        Ok(Self { inner, limits })
    }

    pub fn limits(&self) -> FetchLimits {
        self.limits
    }

    // ==============================
    // Core request implementation
    // ==============================

    async fn fetch_inner(&self, url: &Url) -> Result<RawResponse> {
        let max = self.limits.max_content_size;
        let (host_path, redacted_q) = redact_query(url);

        tracing::debug!(
            host_path=%host_path,
            query=?redacted_q,
            timeout_ms=self.limits.timeout.as_millis() as u64,
            max_bytes=max,
            "http.fetch.start"
        );

        let t0 = Instant::now();
        let resp = self
            .inner
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let final_url = resp.url().clone();
        let headers = flatten_headers(resp.headers());
        let declared = declared_len(resp.headers());

        tracing::debug!(
            %status,
            final_host_path=%redact_query(&final_url).0,
            declared_len=?declared,
            content_encoding=?headers.get("content-encoding"),
            content_type=?headers.get("content-type"),
            "http.fetch.headers"
        );

        if !status.is_success() {
            tracing::warn!(%status, host_path=%host_path, "http.fetch.status_error");
            return Err(ScrapeError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        if let Some(declared) = declared.filter(|len| *len > max as u64) {
            tracing::warn!(declared, max, "http.fetch.declared_too_large");
            return Err(ScrapeError::ContentTooLarge(SizeLimit::Declared {
                declared,
                max,
            }));
        }

        let stream = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| self.transport_error(e)));
        let wire = read_bounded(stream, max).await?;
        let wire_len = wire.len();

        let body = decode_transport(
            wire,
            headers.get("content-encoding").map(String::as_str),
            max,
        )?;

        tracing::debug!(
            %status,
            duration_ms=t0.elapsed().as_millis() as u64,
            wire_len,
            body_len=body.len(),
            "http.fetch.done"
        );

        Ok(RawResponse {
            status: status.as_u16(),
            headers,
            body,
            final_url,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> ScrapeError {
        if err.is_timeout() {
            return self.limits.timeout_error();
        }
        ScrapeError::RequestFailed(error_chain(&err))
    }
}

#[async_trait]
impl PageFetcher for BoundedFetcher {
    async fn fetch(&self, url: &Url) -> Result<RawResponse> {
        // The client timeout already covers the exchange; this also bounds
        // decompression and anything else between send and return.
        match tokio::time::timeout(self.limits.timeout, self.fetch_inner(url)).await {
            Ok(result) => {
                if let Err(err) = &result {
                    tracing::warn!(kind=?err.kind(), error=%err, "http.fetch.failed");
                }
                result
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.limits.timeout.as_millis() as u64,
                    "http.fetch.timeout"
                );
                Err(self.limits.timeout_error())
            }
        }
    }
}

// ==============================
// Helpers
// ==============================

fn browser_headers() -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    h.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    h.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    h.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
    h.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    h.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    h
}

fn declared_len(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers.iter() {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

/// `reqwest` keeps the useful part (DNS, TLS, refused) in the source chain.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !msg.contains(&text) {
            msg.push_str(": ");
            msg.push_str(&text);
        }
        source = cause.source();
    }
    msg
}

fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    // Return "host + path" string and redacted query list for logging
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let is_secret = matches!(
                k.to_ascii_lowercase().as_str(),
                "access_token"
                    | "authorization"
                    | "auth"
                    | "key"
                    | "api_key"
                    | "token"
                    | "secret"
                    | "client_secret"
                    | "password"
                    | "sig"
                    | "signature"
            );
            (k, if is_secret { "<redacted>".into() } else { v.to_string() })
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_headers_request_compression() {
        let h = browser_headers();
        assert_eq!(h.get(ACCEPT_ENCODING).unwrap(), "gzip, deflate");
        assert!(h.get(USER_AGENT).unwrap().to_str().unwrap().starts_with("Mozilla/5.0"));
    }

    #[test]
    fn repeated_headers_are_joined() {
        let mut h = HeaderMap::new();
        h.append("Set-Cookie", HeaderValue::from_static("a=1"));
        h.append("Set-Cookie", HeaderValue::from_static("b=2"));
        h.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        let flat = flatten_headers(&h);
        assert_eq!(flat["set-cookie"], "a=1, b=2");
        assert_eq!(flat["content-encoding"], "gzip");
    }

    #[test]
    fn declared_len_ignores_garbage() {
        let mut h = HeaderMap::new();
        assert_eq!(declared_len(&h), None);
        h.insert(CONTENT_LENGTH, HeaderValue::from_static("12"));
        assert_eq!(declared_len(&h), Some(12));
        h.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
        assert_eq!(declared_len(&h), None);
    }

    #[test]
    fn secrets_in_query_are_redacted() {
        let url = Url::parse("https://example.com/page?q=rust&api_key=abc123").unwrap();
        let (host_path, q) = redact_query(&url);
        assert_eq!(host_path, "example.com/page");
        assert_eq!(q[0], ("q".to_string(), "rust".to_string()));
        assert_eq!(q[1], ("api_key".to_string(), "<redacted>".to_string()));
    }

    #[test]
    fn timeout_error_embeds_configured_seconds() {
        let limits = FetchLimits::new(10, Duration::from_secs(30));
        assert_eq!(
            limits.timeout_error().to_string(),
            "Request timeout after 30 seconds"
        );
    }
}
