//! Locate and validate the URL an invocation asks us to fetch.
//!
//! Structured fields always win over free text. Nothing here does I/O.

use regex::Regex;
use serde_json::Value;
use siphon_common::{Result, ScrapeError};
use std::sync::OnceLock;
use url::Url;

/// Structured field names, in order of preference.
const URL_FIELDS: [&str; 2] = ["url", "website_url"];

const URL_PATTERN: &str = r#"https?://[^\s<>"{}|\\^`\[\]]+"#;

/// The parts of an invocation that may carry a URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolverInput<'a> {
    /// The request body object, in any of the shapes the agent runtime sends.
    pub request_body: Option<&'a Value>,
    /// Function-style `[{ "name": .., "value": .. }]` parameter list.
    pub parameters: Option<&'a Value>,
    /// Free-form user text.
    pub input_text: Option<&'a str>,
}

/// The unvalidated candidate: structured field first, then the first URL in the text.
///
/// ```
/// use serde_json::json;
/// use siphon_web::resolve::{resolve_candidate, validate_url, ResolverInput};
///
/// let body = json!({ "url": "https://example.com/a" });
/// let candidate = resolve_candidate(ResolverInput {
///     request_body: Some(&body),
///     input_text: Some("or maybe https://other.example"),
///     ..Default::default()
/// })
/// .unwrap();
/// assert_eq!(validate_url(&candidate).unwrap().as_str(), "https://example.com/a");
/// ```
pub fn resolve_candidate(input: ResolverInput<'_>) -> Option<String> {
    if let Some(found) = input.request_body.and_then(structured_url) {
        return Some(found);
    }
    if let Some(found) = input.parameters.and_then(named_value) {
        return Some(found);
    }
    input
        .input_text
        .and_then(extract_url_from_text)
        .map(str::to_string)
}

/// First `http(s)://` run in `text`, stopping at whitespace, quotes and brackets.
///
/// ```
/// use siphon_web::resolve::extract_url_from_text;
///
/// let text = "please read <https://example.com/post?id=7> and tell me";
/// assert_eq!(extract_url_from_text(text), Some("https://example.com/post?id=7"));
/// assert_eq!(extract_url_from_text("no links here"), None);
/// ```
pub fn extract_url_from_text(text: &str) -> Option<&str> {
    url_pattern()?.find(text).map(|m| m.as_str())
}

/// Accept only absolute `http`/`https` URLs with a non-empty host.
pub fn validate_url(candidate: &str) -> Result<Url> {
    let invalid = || ScrapeError::InvalidUrl(candidate.to_string());

    let url = Url::parse(candidate).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(invalid()),
    }
}

fn url_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(URL_PATTERN).ok()).as_ref()
}

/// Flat `{ "url": .. }` first, then the OpenAPI-style
/// `content["application/json"].properties` list.
fn structured_url(body: &Value) -> Option<String> {
    let flat = URL_FIELDS
        .iter()
        .find_map(|field| body.get(*field).and_then(non_empty_str));
    if flat.is_some() {
        return flat;
    }

    let content = body.get("content")?;
    let json_body = content
        .get("application/json")
        .or_else(|| content.as_object().and_then(|m| m.values().next()))?;
    named_value(json_body.get("properties")?)
}

/// `[{ "name": "url", "value": ".." }, ..]`, preferring `url` over `website_url`.
fn named_value(list: &Value) -> Option<String> {
    let items = list.as_array()?;
    URL_FIELDS.iter().find_map(|field| {
        items
            .iter()
            .filter(|item| item.get("name").and_then(Value::as_str) == Some(*field))
            .find_map(|item| item.get("value").and_then(non_empty_str))
    })
}

fn non_empty_str(v: &Value) -> Option<String> {
    let s = v.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}
