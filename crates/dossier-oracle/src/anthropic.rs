//! Anthropic Messages API backend

use crate::decision::CallSite;
use crate::provider::{DecisionRequest, Oracle, OracleError, OracleResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const DEFAULT_MAX_TOKENS: u32 = 2048;

pub struct AnthropicOracle {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl AnthropicOracle {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Override the API endpoint (for proxies or compatible gateways).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_request(&self, request: &DecisionRequest) -> MessagesRequest {
        // The context snapshot travels as the user message so the
        // oracle sees exactly what the controller recorded.
        let user_content = serde_json::to_string_pretty(&request.context)
            .unwrap_or_else(|_| request.context.to_string());
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: request.system.clone(),
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: user_content,
            }],
            stream: false,
        }
    }
}

#[async_trait]
impl Oracle for AnthropicOracle {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn decide(&self, request: &DecisionRequest) -> OracleResult<String> {
        let body = self.build_request(request);
        debug!(model = %self.model, site = %request.site, "sending oracle request");

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(OracleError::AuthFailed(
                "invalid Anthropic API key".to_string(),
            ));
        }
        if status.as_u16() == 429 {
            return Err(OracleError::RateLimited);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(OracleError::RequestFailed(format!(
                "HTTP {}: {}",
                status, detail
            )));
        }

        let parsed: MessagesResponse = response.json().await?;
        first_text_block(&parsed, request.site)
    }
}

fn first_text_block(response: &MessagesResponse, site: CallSite) -> OracleResult<String> {
    response
        .content
        .iter()
        .find(|block| block.kind == "text")
        .map(|block| block.text.clone())
        .ok_or_else(|| {
            OracleError::Malformed(format!("no text content in {} response", site))
        })
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<WireMessage>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_context_as_user_message() {
        let oracle = AnthropicOracle::new("key", "test-model").with_max_tokens(64);
        let request = DecisionRequest {
            site: CallSite::Review,
            system: "persona".to_string(),
            context: serde_json::json!({ "step": 2 }),
        };
        let body = oracle.build_request(&request);
        assert_eq!(body.model, "test-model");
        assert_eq!(body.max_tokens, 64);
        assert!(!body.stream);
        assert_eq!(body.messages.len(), 1);
        assert!(body.messages[0].content.contains("\"step\": 2"));
    }

    #[test]
    fn response_parsing_picks_first_text_block() {
        let response: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"thinking","text":""},{"type":"text","text":"{\"kind\":\"triage\"}"}]}"#,
        )
        .unwrap();
        let text = first_text_block(&response, CallSite::Triage).unwrap();
        assert_eq!(text, "{\"kind\":\"triage\"}");
    }

    #[test]
    fn empty_content_is_malformed() {
        let response = MessagesResponse { content: vec![] };
        assert!(matches!(
            first_text_block(&response, CallSite::Triage),
            Err(OracleError::Malformed(_))
        ));
    }
}
