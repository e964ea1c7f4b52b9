//! Anthropic Client
//!
//! LLM client implementation for Anthropic Claude API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::llm_client::{
    log_excerpt, provider_error_message, CompletionParams, ConversationTurn, LlmClient, Speaker,
};
use crate::error::{ServiceError, ServiceResult};

/// Default Anthropic model
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

const PROVIDER: &str = "Anthropic";

/// Anthropic Claude API client
#[derive(Clone)]
pub struct AnthropicClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
    base_url: String,
    params: CompletionParams,
}

impl AnthropicClient {
    /// Create a new Anthropic client with the given API key
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL)
    }

    /// Create with a specific model
    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model: model.to_string(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
            params: CompletionParams::default(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> ServiceResult<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            ServiceError::MissingCredentials("ANTHROPIC_API_KEY environment variable not set".into())
        })?;
        Ok(Self::new(api_key))
    }

    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn params(mut self, params: CompletionParams) -> Self {
        self.params = params;
        self
    }

    /// Rebuild the HTTP client with a request timeout
    pub fn timeout(mut self, timeout: Duration) -> ServiceResult<Self> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn request_body(
        &self,
        system_prompt: &str,
        history: &[ConversationTurn],
        message: &str,
    ) -> serde_json::Value {
        // The messages array must open with a user turn
        let mut messages: Vec<serde_json::Value> = history
            .iter()
            .skip_while(|turn| turn.speaker == Speaker::Assistant)
            .map(|turn| serde_json::json!({"role": turn.speaker.as_wire(), "content": turn.text}))
            .collect();
        messages.push(serde_json::json!({"role": "user", "content": message}));

        serde_json::json!({
            "model": &self.model,
            "max_tokens": self.params.max_tokens,
            "temperature": self.params.temperature,
            "system": system_prompt,
            "messages": messages
        })
    }

    /// Internal API call implementation
    async fn call_api(
        &self,
        system_prompt: &str,
        history: &[ConversationTurn],
        message: &str,
    ) -> ServiceResult<String> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&self.request_body(system_prompt, history, message))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
                message: provider_error_message(&body),
            });
        }

        debug!("Anthropic raw response: {}", log_excerpt(&body, 1000));
        parse_message(&body)
    }
}

/// Concatenated text blocks of a Messages API response
fn parse_message(body: &str) -> ServiceResult<String> {
    #[derive(Deserialize)]
    struct ContentBlock {
        text: Option<String>,
    }
    #[derive(Deserialize)]
    struct ApiResponse {
        content: Vec<ContentBlock>,
    }

    let api_response: ApiResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::Decode {
            provider: PROVIDER,
            message: e.to_string(),
        })?;
    let text: String = api_response
        .content
        .into_iter()
        .filter_map(|c| c.text)
        .collect();
    if text.trim().is_empty() {
        return Err(ServiceError::EmptyCompletion { provider: PROVIDER });
    }
    Ok(text)
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ConversationTurn],
        message: &str,
    ) -> ServiceResult<String> {
        self.call_api(system_prompt, history, message).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client() {
        let client = AnthropicClient::new("test-key".to_string());
        assert_eq!(client.model_name(), DEFAULT_MODEL);
        assert_eq!(client.provider_name(), "Anthropic");
        assert_eq!(client.endpoint(), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn test_with_model() {
        let client = AnthropicClient::with_model("test-key".to_string(), "claude-3-opus");
        assert_eq!(client.model_name(), "claude-3-opus");
    }

    #[test]
    fn test_request_body_starts_with_user() {
        let client = AnthropicClient::new("k".to_string());
        let history = vec![
            ConversationTurn::assistant("Merhaba, size nasıl yardımcı olabilirim?"),
            ConversationTurn::user("Ürünleri listele"),
            ConversationTurn::assistant("İşte ürünler."),
        ];
        let body = client.request_body("SYSTEM", &history, "Kaç tane?");
        assert_eq!(body["system"], "SYSTEM");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[2]["content"], "Kaç tane?");
    }

    #[test]
    fn test_parse_message() {
        let body = r#"{"content":[{"type":"text","text":"42 "},{"type":"text","text":"müşteri"}]}"#;
        assert_eq!(parse_message(body).unwrap(), "42 müşteri");
        assert!(matches!(
            parse_message(r#"{"content":[]}"#),
            Err(ServiceError::EmptyCompletion { .. })
        ));
    }
}
