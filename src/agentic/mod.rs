//! Language model clients
//!
//! One trait, [`LlmClient`], with OpenAI-compatible (Groq, OpenAI) and
//! Anthropic implementations selected by [`AgentBackend`].

pub mod anthropic_client;
pub mod backend;
pub mod client_factory;
pub mod llm_client;
pub mod openai_client;

pub use anthropic_client::AnthropicClient;
pub use backend::AgentBackend;
pub use client_factory::create_llm_client;
pub use llm_client::{CompletionParams, ConversationTurn, LlmClient, Speaker};
pub use openai_client::OpenAiClient;
