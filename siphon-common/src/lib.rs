//! Common types and utilities shared across Siphon crates.
//!
//! This crate defines the error taxonomy, the records that travel between the
//! pipeline stages, and the observability helpers used by every binary and
//! integration test. It stays dependency-minimal so that all crates can depend
//! on it without heavy transitive costs.
//!
//! # Overview
//!
//! - [`ScrapeError`] and [`Result`]: the tagged failure side of every stage
//! - [`ErrorKind`]: a copyable discriminant for logs and assertions
//! - [`ExtractedContent`]: the success record produced by a scrape
//! - [`ScrapeReport`]: the flat, serialisable rendering of an outcome
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use siphon_common::{ErrorKind, ScrapeError};
//!
//! let err = ScrapeError::Timeout { secs: 30 };
//! assert_eq!(err.kind(), ErrorKind::Timeout);
//! assert_eq!(err.to_string(), "Request timeout after 30 seconds");
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// Sentinel used when a document carries no `<title>`.
pub const NO_TITLE: &str = "No title found";

/// Which of the two size checks tripped.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SizeLimit {
    /// The server declared a `Content-Length` above the limit; nothing was read.
    #[error("Content too large: {declared} bytes (max: {max})")]
    Declared { declared: u64, max: usize },

    /// The streamed (or decompressed) body grew past the limit.
    #[error("Content too large: exceeded {max} bytes")]
    Streamed { max: usize },
}

/// Error types produced by the fetch-and-extract pipeline.
///
/// Every variant is a terminal outcome. Nothing here is retried internally.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    /// Neither a structured field nor the free text carried a URL.
    #[error("No valid URL provided. Please provide a URL to scrape.")]
    NoUrlFound,

    /// The candidate failed scheme/host validation.
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    ContentTooLarge(SizeLimit),

    /// The exchange did not finish within the configured duration.
    #[error("Request timeout after {secs} seconds")]
    Timeout { secs: u64 },

    /// Connection, DNS, TLS or other transport-level failure.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to decompress {encoding} content: {cause}")]
    DecompressionFailed { encoding: String, cause: String },

    #[error("Failed to decode content: {0}")]
    DecodeFailed(String),

    /// Unexpected failure while parsing or extracting markup.
    #[error("Parsing error: {0}")]
    ParseError(String),

    /// Non-2xx final status after redirects.
    #[error("Request failed: HTTP {status} {reason}")]
    HttpStatus { status: u16, reason: String },
}

/// Discriminant of [`ScrapeError`], handy for structured logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoUrlFound,
    InvalidUrl,
    ContentTooLarge,
    Timeout,
    RequestFailed,
    DecompressionFailed,
    DecodeFailed,
    ParseError,
    HttpStatus,
}

impl ScrapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoUrlFound => ErrorKind::NoUrlFound,
            Self::InvalidUrl(_) => ErrorKind::InvalidUrl,
            Self::ContentTooLarge(_) => ErrorKind::ContentTooLarge,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::RequestFailed(_) => ErrorKind::RequestFailed,
            Self::DecompressionFailed { .. } => ErrorKind::DecompressionFailed,
            Self::DecodeFailed(_) => ErrorKind::DecodeFailed,
            Self::ParseError(_) => ErrorKind::ParseError,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
        }
    }

    /// True for failures raised before any network call was attempted.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(self, Self::NoUrlFound | Self::InvalidUrl(_))
    }
}

/// Convenient alias for results that use [`ScrapeError`].
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Clean text and metadata extracted from one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContent {
    /// The URL as requested.
    pub url: String,
    /// The URL after redirects.
    pub final_url: String,
    pub title: String,
    /// Empty when the page has no `<meta name="description">`.
    pub description: String,
    /// Normalised text, truncation marker included when it was cut.
    pub text: String,
    /// Character count of `text`, marker included.
    pub text_length: usize,
}

/// Flat rendering of a scrape outcome.
///
/// On success `error` is absent; on failure only `success`, `url` (when one
/// was resolved) and `error` are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ScrapeReport {
    /// Render an outcome; `url` is the candidate that was attempted, if any.
    pub fn from_outcome(url: Option<&str>, outcome: &Result<ExtractedContent>) -> Self {
        match outcome {
            Ok(content) => Self {
                success: true,
                url: Some(content.url.clone()),
                final_url: Some(content.final_url.clone()),
                title: Some(content.title.clone()),
                description: Some(content.description.clone()),
                text: Some(content.text.clone()),
                text_length: Some(content.text_length),
                error: None,
                error_kind: None,
            },
            Err(err) => Self {
                success: false,
                url: url.map(str::to_string),
                final_url: None,
                title: None,
                description: None,
                text: None,
                text_length: None,
                error: Some(err.to_string()),
                error_kind: Some(err.kind()),
            },
        }
    }

    /// A failure outside the error taxonomy, such as a panic in the pipeline.
    pub fn unexpected(message: &str) -> Self {
        Self {
            success: false,
            url: None,
            final_url: None,
            title: None,
            description: None,
            text: None,
            text_length: None,
            error: Some(message.to_string()),
            error_kind: None,
        }
    }
}
