//! OpenAI-compatible Client
//!
//! Chat-completions client for OpenAI and for Groq, which serves the same
//! wire format under a different base URL.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::llm_client::{
    log_excerpt, provider_error_message, CompletionParams, ConversationTurn, LlmClient,
};
use crate::error::{ServiceError, ServiceResult};

/// Default Groq model
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default OpenAI model
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible API client
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
    base_url: String,
    provider: &'static str,
    params: CompletionParams,
}

impl OpenAiClient {
    /// Create a new OpenAI client with the given API key
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, OPENAI_DEFAULT_MODEL)
    }

    /// Create with a specific model
    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model: model.to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
            provider: "OpenAI",
            params: CompletionParams::default(),
        }
    }

    /// Create a client pointed at Groq
    pub fn groq(api_key: String) -> Self {
        Self {
            base_url: GROQ_BASE_URL.to_string(),
            provider: "Groq",
            ..Self::with_model(api_key, GROQ_DEFAULT_MODEL)
        }
    }

    /// Create from environment variables
    pub fn from_env() -> ServiceResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            ServiceError::MissingCredentials("OPENAI_API_KEY environment variable not set".into())
        })?;
        Ok(Self::new(api_key))
    }

    pub fn model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
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
        format!("{}/chat/completions", self.base_url)
    }

    fn request_body(
        &self,
        system_prompt: &str,
        history: &[ConversationTurn],
        message: &str,
    ) -> serde_json::Value {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(serde_json::json!({"role": "system", "content": system_prompt}));
        messages.extend(
            history
                .iter()
                .map(|turn| serde_json::json!({"role": turn.speaker.as_wire(), "content": turn.text})),
        );
        messages.push(serde_json::json!({"role": "user", "content": message}));

        serde_json::json!({
            "model": &self.model,
            "messages": messages,
            "temperature": self.params.temperature,
            "max_tokens": self.params.max_tokens
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
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(system_prompt, history, message))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                provider: self.provider,
                status: status.as_u16(),
                message: provider_error_message(&body),
            });
        }

        debug!("{} raw response: {}", self.provider, log_excerpt(&body, 1000));
        parse_completion(self.provider, &body)
    }
}

/// First choice's message content from a chat-completions response body
fn parse_completion(provider: &'static str, body: &str) -> ServiceResult<String> {
    #[derive(Deserialize)]
    struct Message {
        content: Option<String>,
    }
    #[derive(Deserialize)]
    struct Choice {
        message: Message,
    }
    #[derive(Deserialize)]
    struct ApiResponse {
        choices: Vec<Choice>,
    }

    let api_response: ApiResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::Decode {
            provider,
            message: e.to_string(),
        })?;
    api_response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(ServiceError::EmptyCompletion { provider })
}

#[async_trait]
impl LlmClient for OpenAiClient {
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
        self.provider
    }
}
