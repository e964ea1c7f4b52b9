//! ERP Assistant Command Line Interface
//!
//! # Usage
//!
//! ```bash
//! # Ask a question as a role
//! erp-assistant ask "Kaç müşteri var?" --role Admin
//!
//! # Show what a role's translation prompt can see
//! erp-assistant schema --role Personel
//!
//! # Dump the store's models as a catalog skeleton
//! erp-assistant models > catalog.yaml
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use erp_assistant::{
    agentic::create_llm_client,
    config::{AssistantConfig, OdooConfig},
    odoo::OdooClient,
    pipeline::AssistantPipeline,
    schema::{AccessGate, RoleDirectory, SchemaCatalog, SchemaEntity},
};

#[derive(Parser)]
#[command(name = "erp-assistant")]
#[command(version)]
#[command(about = "Ask natural-language questions about Odoo records")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: text (default) or json
    #[arg(long, short = 'o', global = true, default_value = "text", value_enum)]
    format: OutputFormat,

    /// Catalog YAML (builtin catalog if not provided)
    #[arg(long, global = true, env = "ASSISTANT_CATALOG")]
    catalog: Option<PathBuf>,

    /// Role directory YAML (builtin roles if not provided)
    #[arg(long, global = true, env = "ASSISTANT_ROLES")]
    roles: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one question against the live record store
    Ask {
        /// The question
        message: String,

        /// Role name from the role directory
        #[arg(short, long, default_value = "Admin")]
        role: String,
    },

    /// Print the scoped schema a role's prompt contains
    Schema {
        /// Role name from the role directory
        #[arg(short, long)]
        role: String,
    },

    /// List the record store's models as a catalog skeleton
    Models,
}

#[derive(Serialize)]
struct CatalogSkeleton {
    entities: Vec<SchemaEntity>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("erp_assistant=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Ask { message, role } => cmd_ask(&cli, message, role).await,
        Commands::Schema { role } => cmd_schema(&cli, role),
        Commands::Models => cmd_models(&cli).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_ask(cli: &Cli, message: &str, role: &str) -> anyhow::Result<()> {
    let config = AssistantConfig::from_env().context("loading configuration")?;
    let catalog = SchemaCatalog::load(cli.catalog.as_deref())?;
    let roles = RoleDirectory::load(cli.roles.as_deref())?;

    let pipeline = AssistantPipeline::new(
        create_llm_client(&config.llm)?,
        Arc::new(OdooClient::new(&config.odoo)?),
        Arc::new(catalog),
        &config.pipeline,
    );
    let answer = pipeline.answer(message, &[], &roles.resolve(role)).await;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&answer)?),
        OutputFormat::Text => {
            println!("{}", answer.content);
            if let Some(data) = &answer.data {
                println!();
                println!("{}", serde_json::to_string_pretty(data)?);
            }
        }
    }
    Ok(())
}

fn cmd_schema(cli: &Cli, role: &str) -> anyhow::Result<()> {
    let catalog = SchemaCatalog::load(cli.catalog.as_deref())?;
    let roles = RoleDirectory::load(cli.roles.as_deref())?;
    let context = roles.resolve(role);
    let scoped = AccessGate::new(Arc::new(catalog)).scoped_schema(&context);

    match cli.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "role": context.role,
                "permitted_entities": context.permitted_entities,
                "schema": scoped.describe(),
            }))?
        ),
        OutputFormat::Text => println!("{}", scoped.describe()),
    }
    Ok(())
}

async fn cmd_models(cli: &Cli) -> anyhow::Result<()> {
    let config = OdooConfig::from_env().context("loading Odoo configuration")?;
    let models = OdooClient::new(&config)?.list_models().await?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&models)?),
        OutputFormat::Text => {
            let skeleton = CatalogSkeleton {
                entities: models
                    .into_iter()
                    .map(|m| SchemaEntity::new(m.model, Vec::new()).with_label(m.name))
                    .collect(),
            };
            print!("{}", serde_yaml::to_string(&skeleton)?);
        }
    }
    Ok(())
}
