//! Backend Selection
//!
//! Enum for selecting between LLM providers (Groq, OpenAI, Anthropic).

use std::str::FromStr;

use crate::error::ConfigError;

/// LLM backend provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentBackend {
    /// Groq, OpenAI-compatible (default)
    #[default]
    Groq,
    /// OpenAI GPT
    OpenAi,
    /// Anthropic Claude
    Anthropic,
}

impl AgentBackend {
    /// Create from LLM_BACKEND environment variable
    ///
    /// Valid values: "groq", "openai", "gpt", "anthropic", "claude"
    /// Defaults to Groq if not set
    pub fn from_env() -> Result<Self, ConfigError> {
        let value = std::env::var("LLM_BACKEND").unwrap_or_else(|_| "groq".to_string());
        value
            .parse()
            .map_err(|e: ParseBackendError| ConfigError::UnknownBackend(e.0))
    }

    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            AgentBackend::Groq => "Groq",
            AgentBackend::OpenAi => "OpenAI",
            AgentBackend::Anthropic => "Anthropic",
        }
    }

    /// Environment variable holding this provider's API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            AgentBackend::Groq => "GROQ_API_KEY",
            AgentBackend::OpenAi => "OPENAI_API_KEY",
            AgentBackend::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Error type for parsing AgentBackend
#[derive(Debug)]
pub struct ParseBackendError(String);

impl std::fmt::Display for ParseBackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Unknown LLM_BACKEND '{}'. Valid values: groq, openai, gpt, anthropic, claude",
            self.0
        )
    }
}

impl std::error::Error for ParseBackendError {}

impl FromStr for AgentBackend {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(AgentBackend::Groq),
            "openai" | "gpt" => Ok(AgentBackend::OpenAi),
            "anthropic" | "claude" => Ok(AgentBackend::Anthropic),
            other => Err(ParseBackendError(other.to_string())),
        }
    }
}

impl std::fmt::Display for AgentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("groq".parse::<AgentBackend>().unwrap(), AgentBackend::Groq);
        assert_eq!(
            "claude".parse::<AgentBackend>().unwrap(),
            AgentBackend::Anthropic
        );
        assert_eq!(
            "ANTHROPIC".parse::<AgentBackend>().unwrap(),
            AgentBackend::Anthropic
        );
        assert_eq!(
            "openai".parse::<AgentBackend>().unwrap(),
            AgentBackend::OpenAi
        );
        assert_eq!("gpt".parse::<AgentBackend>().unwrap(), AgentBackend::OpenAi);
        assert!("invalid".parse::<AgentBackend>().is_err());
    }

    #[test]
    fn test_default() {
        assert_eq!(AgentBackend::default(), AgentBackend::Groq);
    }

    #[test]
    fn test_api_key_vars() {
        assert_eq!(AgentBackend::Groq.api_key_var(), "GROQ_API_KEY");
        assert_eq!(AgentBackend::Anthropic.api_key_var(), "ANTHROPIC_API_KEY");
    }
}
