mod alignment;
mod artifacts;
mod config;
mod errors;
mod ingest;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::alignment::agents::{LlmGapAnalyzer, LlmPostingAnalyzer, LlmRewriter, LlmScorer};
use crate::alignment::orchestrator::RefinementOrchestrator;
use crate::alignment::service::AlignmentService;
use crate::config::Config;
use crate::ingest::parser::LlmDocumentParser;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Refit API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client; the credential stays inside it
    let llm = LlmClient::new(config.anthropic_api_key.clone(), config.llm_timeout);
    info!(
        "LLM client initialized (model: {}, timeout: {}s)",
        llm_client::MODEL,
        config.llm_timeout.as_secs()
    );

    // Build collaborators and the orchestrator that drives them
    let orchestrator = RefinementOrchestrator::new(
        Arc::new(LlmGapAnalyzer::new(llm.clone())),
        Arc::new(LlmRewriter::new(llm.clone())),
        Arc::new(LlmScorer::new(llm.clone())),
    );
    let alignment = AlignmentService::new(Arc::new(LlmPostingAnalyzer::new(llm.clone())), orchestrator);
    info!(
        "Alignment service ready (default budget: {} iterations)",
        config.max_iterations
    );

    if !config.artifact_dir.exists() {
        tokio::fs::create_dir_all(&config.artifact_dir).await?;
        info!("Created artifact dir {}", config.artifact_dir.display());
    }

    // Build app state
    let state = AppState {
        config: config.clone(),
        document_parser: Arc::new(LlmDocumentParser::new(llm)),
        alignment,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the front end has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
