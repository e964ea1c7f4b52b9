//! ERP Assistant - natural-language questions over Odoo records
//!
//! A question flows through one pipeline:
//! Scope Schema -> Build Prompt -> Complete -> Extract Action -> Authorize
//! -> Count | Search (+ Fallback) -> Summarize
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use erp_assistant::agentic::create_llm_client;
//! use erp_assistant::config::AssistantConfig;
//! use erp_assistant::odoo::OdooClient;
//! use erp_assistant::pipeline::AssistantPipeline;
//! use erp_assistant::schema::{RoleDirectory, SchemaCatalog};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = AssistantConfig::from_env()?;
//! let pipeline = AssistantPipeline::new(
//!     create_llm_client(&config.llm)?,
//!     Arc::new(OdooClient::new(&config.odoo)?),
//!     Arc::new(SchemaCatalog::load(config.catalog_path.as_deref())?),
//!     &config.pipeline,
//! );
//! let role = RoleDirectory::builtin()?.resolve("Admin");
//! let answer = pipeline.answer("Kaç müşteri var?", &[], &role).await;
//! println!("{}", answer.content);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Environment configuration
pub mod config;

// Catalog, roles and the access gate
pub mod schema;

// Model reply -> action -> native predicates
pub mod action;
pub mod predicate;

// Language model clients
pub mod agentic;

// Record store seam, executor and fallback
pub mod executor;
pub mod odoo;

// Prompting and the request pipeline
pub mod pipeline;
pub mod prompt;
pub mod summarizer;

// REST API (when enabled)
#[cfg(feature = "server")]
pub mod api;

pub use error::{BackendError, ConfigError, ServiceError};
pub use pipeline::{AnswerData, AssistantAnswer, AssistantPipeline};
