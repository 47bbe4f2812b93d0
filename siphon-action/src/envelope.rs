//! The fixed response shape the agent runtime expects back from a tool.
//!
//! The outer `statusCode` is always 200. Whether the scrape worked is only
//! visible in the embedded text, because the runtime treats any other status
//! as a hard tool failure it cannot recover from.

use serde::{Deserialize, Serialize};
use siphon_common::{ExtractedContent, ScrapeError};

pub const STATUS_OK: u16 = 200;

/// Serialising the body failed; nothing usable can be returned.
#[derive(thiserror::Error, Debug)]
#[error("failed to encode response envelope: {0}")]
pub struct EnvelopeError(#[from] serde_json::Error);

/// Where the runtime should route the response. Opaque to us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRoute {
    pub action_group: String,
    pub function: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// JSON-encoded [`EnvelopeBody`].
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeBody {
    pub response: ActionResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub action_group: String,
    pub function: String,
    pub function_response: FunctionResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub response_body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBody {
    #[serde(rename = "TEXT")]
    pub text: TextBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBody {
    pub body: String,
}

impl ResponseEnvelope {
    /// Wrap `text` in the nested body for `route`.
    pub fn new(route: &ActionRoute, text: String) -> Result<Self, EnvelopeError> {
        let body = EnvelopeBody {
            response: ActionResponse {
                action_group: route.action_group.clone(),
                function: route.function.clone(),
                function_response: FunctionResponse {
                    response_body: ResponseBody {
                        text: TextBody { body: text },
                    },
                },
            },
        };
        Ok(Self {
            status_code: STATUS_OK,
            body: serde_json::to_string(&body)?,
        })
    }

    pub fn decode_body(&self) -> serde_json::Result<EnvelopeBody> {
        serde_json::from_str(&self.body)
    }

    /// The embedded text, if the body decodes.
    pub fn text(&self) -> Option<String> {
        self.decode_body()
            .ok()
            .map(|b| b.response.function_response.response_body.text.body)
    }
}

/// Text for a finished scrape, successful or not.
pub fn render_outcome(outcome: &Result<ExtractedContent, ScrapeError>) -> String {
    match outcome {
        Ok(content) => success_text(content),
        Err(err) if err.is_resolution_failure() => error_text(&err.to_string()),
        Err(err) => format!("Failed to scrape website: {err}"),
    }
}

pub fn success_text(content: &ExtractedContent) -> String {
    format!(
        "Successfully scraped: {}\nURL: {}\nContent length: {} characters\n\nContent:\n{}",
        content.title, content.url, content.text_length, content.text
    )
}

/// Short form used before a fetch was attempted, and for faults.
pub fn error_text(message: &str) -> String {
    format!("Error: {message}")
}

/// Text for a fault nothing else anticipated.
pub fn unexpected_text(cause: &str) -> String {
    error_text(&unexpected_message(cause))
}

pub fn unexpected_message(cause: &str) -> String {
    format!("Error scraping website: {cause}")
}
