//! Configuration
//!
//! Everything is read from the environment (optionally seeded from a `.env`
//! file by the binaries). Library code receives fully built config structs.

use std::path::PathBuf;
use std::str::FromStr;

use crate::agentic::backend::AgentBackend;
use crate::error::ConfigError;

/// Language model connection settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: AgentBackend,
    pub api_key: String,
    /// Provider default when `None`
    pub model: Option<String>,
    /// Override for the provider endpoint base URL
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = AgentBackend::from_env()?;
        Ok(Self {
            backend,
            api_key: required_var(backend.api_key_var())?,
            model: optional_var("LLM_MODEL"),
            base_url: optional_var("LLM_BASE_URL"),
            timeout_secs: parse_var("LLM_TIMEOUT_SECS", 60)?,
            max_tokens: parse_var("LLM_MAX_TOKENS", 1000)?,
            temperature: parse_var("LLM_TEMPERATURE", 0.1)?,
        })
    }
}

/// Odoo XML-RPC connection settings
#[derive(Debug, Clone)]
pub struct OdooConfig {
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

impl OdooConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: required_var("ODOO_URL")?,
            database: required_var("ODOO_DB")?,
            username: required_var("ODOO_USERNAME")?,
            password: required_var("ODOO_PASSWORD")?,
            timeout_secs: parse_var("ODOO_TIMEOUT_SECS", 30)?,
        })
    }
}

/// Knobs for the translation pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub default_limit: u32,
    pub max_limit: u32,
    pub fallback_limit: u32,
    /// Budget for the row JSON sent to the summarizer
    pub summary_max_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_limit: crate::action::DEFAULT_LIMIT,
            max_limit: crate::action::HARD_LIMIT_CAP,
            fallback_limit: crate::executor::MAX_FALLBACK_LIMIT,
            summary_max_chars: 12_000,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            default_limit: parse_var("ASSISTANT_DEFAULT_LIMIT", defaults.default_limit)?,
            max_limit: parse_var("ASSISTANT_MAX_LIMIT", defaults.max_limit)?,
            fallback_limit: parse_var("ASSISTANT_FALLBACK_LIMIT", defaults.fallback_limit)?,
            summary_max_chars: parse_var("ASSISTANT_SUMMARY_MAX_CHARS", defaults.summary_max_chars)?,
        })
    }
}

/// Full assistant configuration
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub llm: LlmConfig,
    pub odoo: OdooConfig,
    pub pipeline: PipelineConfig,
    pub catalog_path: Option<PathBuf>,
    pub roles_path: Option<PathBuf>,
}

impl AssistantConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            llm: LlmConfig::from_env()?,
            odoo: OdooConfig::from_env()?,
            pipeline: PipelineConfig::from_env()?,
            catalog_path: optional_var("ASSISTANT_CATALOG").map(PathBuf::from),
            roles_path: optional_var("ASSISTANT_ROLES").map(PathBuf::from),
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_var(name: &str) -> Result<String, ConfigError> {
    optional_var(name).ok_or_else(|| ConfigError::MissingVar(name.to_string()))
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_var(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
            var: name.to_string(),
            reason: format!("'{}': {}", raw, e),
        }),
    }
}
