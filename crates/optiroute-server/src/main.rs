//! OptiRoute Server - flood-aware route ranking backend

use anyhow::Result;
use optiroute_server::{api, config::Config, state::AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("optiroute_server=debug".parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting OptiRoute Server...");
    if config.ors_api_key.is_none() {
        tracing::warn!("ORS_API_KEY not set; /api/routes will fail until it is configured");
    }
    if config.weather_url.trim().is_empty() {
        tracing::warn!("WEATHER_URL empty; risk is computed for dry conditions");
    }

    let host = config.host.clone();
    let port = config.port;
    let state = Arc::new(AppState::new(config));
    let app = api::app(state);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
