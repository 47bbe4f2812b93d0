//! Invocation payload as delivered by the agent runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use siphon_web::resolve::ResolverInput;

/// One tool call. Every field is optional and unknown fields are ignored, so
/// both the OpenAPI-style and the function-style agent payloads deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl InvocationEvent {
    /// An event carrying `{ "requestBody": { "url": .. } }`.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            request_body: Some(serde_json::json!({ "url": url.into() })),
            ..Default::default()
        }
    }

    /// An event carrying only free text.
    pub fn for_text(text: impl Into<String>) -> Self {
        Self {
            input_text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn resolver_input(&self) -> ResolverInput<'_> {
        ResolverInput {
            request_body: self.request_body.as_ref(),
            parameters: self.parameters.as_ref(),
            input_text: self.input_text.as_deref().filter(|t| !t.is_empty()),
        }
    }
}
