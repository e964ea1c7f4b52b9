//! Error handling for the assistant pipeline
//!
//! Each collaborator seam gets its own error type so the pipeline can decide
//! per stage how a failure reaches the user.

use thiserror::Error;

/// Failures talking to the language model service
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Model endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{provider} API error {status}: {message}")]
    Status {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{provider} returned an empty completion")]
    EmptyCompletion { provider: &'static str },

    #[error("Failed to decode {provider} response: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

/// Failures talking to the record store
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Record store unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Record store returned HTTP {status}")]
    Status { status: u16 },

    #[error("Authentication failed for user '{username}' on database '{database}'")]
    Authentication { username: String, database: String },

    #[error("Remote fault {code}: {message}")]
    Fault { code: i64, message: String },

    #[error("Malformed XML-RPC response: {0}")]
    Protocol(String),

    #[error("Invalid record store URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl From<quick_xml::Error> for BackendError {
    fn from(error: quick_xml::Error) -> Self {
        BackendError::Protocol(error.to_string())
    }
}

/// A model reply that looked like an action but could not be decoded.
///
/// Never leaves the action extractor; it is logged and turned into `NoAction`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedActionError {
    #[error("Invalid JSON: {0}")]
    Json(String),

    #[error("Missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("Key '{key}' has the wrong shape: {reason}")]
    InvalidShape { key: String, reason: String },
}

/// Rejections from the access gate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("Role '{role}' may not read '{entity}'")]
    EntityNotPermitted { role: String, entity: String },

    #[error("Field '{field}' is not part of '{entity}'")]
    FieldNotPermitted { entity: String, field: String },
}

/// Startup configuration problems
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    MissingVar(String),

    #[error("Invalid value for {var}: {reason}")]
    InvalidVar { var: String, reason: String },

    #[error("Unknown LLM_BACKEND '{0}'. Valid values: groq, openai, gpt, anthropic, claude")]
    UnknownBackend(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid catalog: {0}")]
    Catalog(String),
}

/// Result alias for language model calls
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result alias for record store calls
pub type BackendResult<T> = Result<T, BackendError>;
