//! One invocation end to end: resolve, fetch, extract, wrap.

use crate::envelope::{self, ActionRoute, EnvelopeError, ResponseEnvelope};
use crate::invocation::InvocationEvent;
use futures::FutureExt;
use siphon_common::{ExtractedContent, Result, ScrapeError, ScrapeReport};
use siphon_config::SiphonConfig;
use siphon_http::{BoundedFetcher, FetchLimits, PageFetcher};
use siphon_web::{extract, resolve};
use std::panic::AssertUnwindSafe;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

/// What one invocation produced before it was wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRun {
    /// The candidate URL, when the resolver found one.
    pub url: Option<String>,
    pub outcome: Result<ExtractedContent>,
}

impl ScrapeRun {
    pub fn report(&self) -> ScrapeReport {
        ScrapeReport::from_outcome(self.url.as_deref(), &self.outcome)
    }
}

/// Holds the process configuration and a fetcher. Each call is independent.
pub struct ScrapeHandler<F = BoundedFetcher> {
    config: SiphonConfig,
    fetcher: F,
}

impl ScrapeHandler<BoundedFetcher> {
    /// Build the production handler with a [`BoundedFetcher`] sized from `config`.
    pub fn from_config(config: SiphonConfig) -> Result<Self> {
        let limits = FetchLimits::new(config.max_content_size, config.request_timeout_duration());
        let fetcher = BoundedFetcher::new(limits)?;
        Ok(Self { config, fetcher })
    }
}

impl<F: PageFetcher> ScrapeHandler<F> {
    pub fn with_fetcher(config: SiphonConfig, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &SiphonConfig {
        &self.config
    }

    /// Run the pipeline and wrap whatever happened in the response envelope.
    ///
    /// Domain failures, and even a panic inside the pipeline, come back as an
    /// `Ok` envelope with explanatory text. `Err` means the envelope itself
    /// could not be encoded.
    pub async fn handle(
        &self,
        event: &InvocationEvent,
    ) -> std::result::Result<ResponseEnvelope, EnvelopeError> {
        let route = self.route(event);
        let text = match self.guarded_run(event).await {
            Ok(run) => envelope::render_outcome(&run.outcome),
            Err(cause) => envelope::unexpected_text(&cause),
        };
        tracing::debug!(text_len = text.len(), "invocation.envelope");
        ResponseEnvelope::new(&route, text)
    }

    /// Like [`handle`](Self::handle), but return the flat report.
    ///
    /// A panic in the pipeline becomes a failed report carrying the panic
    /// message.
    pub async fn report(&self, event: &InvocationEvent) -> ScrapeReport {
        match self.guarded_run(event).await {
            Ok(run) => run.report(),
            Err(cause) => ScrapeReport::unexpected(&envelope::unexpected_message(&cause)),
        }
    }

    /// [`run`](Self::run) inside the invocation span, with panics caught.
    async fn guarded_run(&self, event: &InvocationEvent) -> std::result::Result<ScrapeRun, String> {
        let span = tracing::info_span!(
            "invocation",
            id = %Uuid::new_v4(),
            session = event.session_id.as_deref().unwrap_or("-"),
        );

        async {
            AssertUnwindSafe(self.run(event))
                .catch_unwind()
                .await
                .map_err(|panic| {
                    let cause = panic_message(panic.as_ref());
                    tracing::error!(cause = %cause, "invocation.unexpected_fault");
                    cause
                })
        }
        .instrument(span)
        .await
    }

    /// Resolve the URL and scrape it, without wrapping.
    pub async fn run(&self, event: &InvocationEvent) -> ScrapeRun {
        tracing::info!(
            has_text = event.input_text.is_some(),
            has_body = event.request_body.is_some(),
            has_parameters = event.parameters.is_some(),
            "invocation.received"
        );

        let input = event.resolver_input();
        let Some(candidate) = resolve::resolve_candidate(input) else {
            tracing::warn!("invocation.no_url");
            return ScrapeRun {
                url: None,
                outcome: Err(ScrapeError::NoUrlFound),
            };
        };

        let url = match resolve::validate_url(&candidate) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(candidate = %candidate, "invocation.invalid_url");
                return ScrapeRun {
                    url: Some(candidate),
                    outcome: Err(err),
                };
            }
        };

        tracing::info!(url = %url, "invocation.url_resolved");
        let outcome = self.scrape(url).await;
        match &outcome {
            Ok(content) => tracing::info!(
                title = %content.title,
                text_length = content.text_length,
                final_url = %content.final_url,
                "invocation.scraped"
            ),
            Err(err) => {
                tracing::error!(kind = ?err.kind(), error = %err, "invocation.scrape_failed")
            }
        }

        ScrapeRun {
            url: Some(candidate),
            outcome,
        }
    }

    /// Fetch a validated URL and extract its content.
    pub async fn scrape(&self, url: Url) -> Result<ExtractedContent> {
        let raw = self.fetcher.fetch(&url).await?;
        let final_url = raw.final_url.to_string();
        let body = raw.body;
        let max_text_length = self.config.max_text_length;

        // html5ever trees are not `Send`; parse on the blocking pool.
        let page = tokio::task::spawn_blocking(move || {
            let html = extract::decode_lossy(&body);
            extract::extract_page(&html, max_text_length)
        })
        .await
        .map_err(|e| {
            if e.is_panic() {
                ScrapeError::ParseError(panic_message(e.into_panic().as_ref()))
            } else {
                ScrapeError::ParseError(e.to_string())
            }
        })?;

        Ok(page.into_content(url.as_str(), final_url))
    }

    fn route(&self, event: &InvocationEvent) -> ActionRoute {
        let pick = |given: &Option<String>, fallback: &str| {
            given
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        ActionRoute {
            action_group: pick(&event.action_group, &self.config.action_group),
            function: pick(&event.function, &self.config.function),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
