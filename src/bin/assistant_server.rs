use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use erp_assistant::{
    agentic::create_llm_client,
    api::{create_router, AppState},
    config::AssistantConfig,
    odoo::OdooClient,
    pipeline::AssistantPipeline,
    schema::{RoleDirectory, SchemaCatalog},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("erp_assistant=info,tower_http=debug")),
        )
        .init();

    let config = AssistantConfig::from_env().context("loading configuration")?;

    let catalog = SchemaCatalog::load(config.catalog_path.as_deref())?;
    let roles = RoleDirectory::load(config.roles_path.as_deref())?;
    info!(
        "Loaded {} entities and {} roles",
        catalog.len(),
        roles.roles().len()
    );

    let llm = create_llm_client(&config.llm)?;
    let store = OdooClient::new(&config.odoo)?;
    info!("Record store: {:?}", store);

    let pipeline = AssistantPipeline::new(llm, Arc::new(store), Arc::new(catalog), &config.pipeline);

    // Create application state
    let app_state = AppState {
        pipeline: Arc::new(pipeline),
        roles: Arc::new(roles),
    };
    let app = create_router(app_state);

    // Determine port
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);

    let addr = format!("0.0.0.0:{}", port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
