//! Client Factory
//!
//! Builds the configured provider client behind `Arc<dyn LlmClient>`.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::anthropic_client::AnthropicClient;
use super::backend::AgentBackend;
use super::llm_client::{CompletionParams, LlmClient};
use super::openai_client::OpenAiClient;
use crate::config::LlmConfig;
use crate::error::{ServiceError, ServiceResult};

pub fn create_llm_client(config: &LlmConfig) -> ServiceResult<Arc<dyn LlmClient>> {
    if config.api_key.trim().is_empty() {
        return Err(ServiceError::MissingCredentials(format!(
            "{} is empty",
            config.backend.api_key_var()
        )));
    }

    let params = CompletionParams {
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };
    let timeout = Duration::from_secs(config.timeout_secs);

    let client: Arc<dyn LlmClient> = match config.backend {
        AgentBackend::Groq | AgentBackend::OpenAi => {
            let mut client = match config.backend {
                AgentBackend::Groq => OpenAiClient::groq(config.api_key.clone()),
                _ => OpenAiClient::new(config.api_key.clone()),
            };
            if let Some(model) = &config.model {
                client = client.model(model);
            }
            if let Some(base_url) = &config.base_url {
                client = client.base_url(base_url);
            }
            Arc::new(client.params(params).timeout(timeout)?)
        }
        AgentBackend::Anthropic => {
            let mut client = match &config.model {
                Some(model) => AnthropicClient::with_model(config.api_key.clone(), model),
                None => AnthropicClient::new(config.api_key.clone()),
            };
            if let Some(base_url) = &config.base_url {
                client = client.base_url(base_url);
            }
            Arc::new(client.params(params).timeout(timeout)?)
        }
    };

    info!(
        "Using {} model {}",
        client.provider_name(),
        client.model_name()
    );
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(backend: AgentBackend) -> LlmConfig {
        LlmConfig {
            backend,
            api_key: "test-key".to_string(),
            model: None,
            base_url: None,
            timeout_secs: 5,
            max_tokens: 1000,
            temperature: 0.1,
        }
    }

    #[test]
    fn test_default_backend_is_groq() {
        let client = create_llm_client(&config(AgentBackend::default())).unwrap();
        assert_eq!(client.provider_name(), "Groq");
        assert_eq!(client.model_name(), "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_model_override() {
        let mut cfg = config(AgentBackend::Anthropic);
        cfg.model = Some("claude-3-5-haiku-latest".to_string());
        let client = create_llm_client(&cfg).unwrap();
        assert_eq!(client.provider_name(), "Anthropic");
        assert_eq!(client.model_name(), "claude-3-5-haiku-latest");
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut cfg = config(AgentBackend::OpenAi);
        cfg.api_key = "  ".to_string();
        assert!(matches!(
            create_llm_client(&cfg),
            Err(ServiceError::MissingCredentials(_))
        ));
    }
}
