mod analysis;
mod config;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::{AnalysisSettings, Analyzer};
use crate::config::Config;
use crate::llm_client::Backends;
use crate::routes::build_router;
use crate::state::AppState;

fn key_status(key: &str) -> &'static str {
    if key.is_empty() {
        "missing"
    } else {
        "set"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Profile Analyzer API v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Cerebras key: {}, OpenRouter key: {}",
        key_status(&config.cerebras_api_key),
        key_status(&config.openrouter_api_key)
    );

    // Initialize LLM backends
    let backends = Backends::from_config(&config)?;
    info!(
        "LLM backends initialized (fast: {}, reasoning: {})",
        config.cerebras_model, config.openrouter_model
    );

    let settings = AnalysisSettings::from_config(&config);
    info!("Streaming batch size: {}", settings.batch_size);

    // Build app state
    let state = AppState {
        analyzer: Analyzer::new(backends, settings),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
