// =============================================================================
// Dalal Lens — Main Entry Point
// =============================================================================
//
// Serves the Indian equity dashboard API. Every `/api/v1/analyze` call runs
// one independent fetch-and-compute cycle against the chart provider.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod error;
mod indicators;
mod market_data;
mod runtime_config;
mod types;
mod yahoo;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::DashboardConfig;
use crate::yahoo::YahooClient;

const DEFAULT_CONFIG_PATH: &str = "dashboard_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Dalal Lens starting up");

    let config_path =
        std::env::var("DALAL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = DashboardConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        DashboardConfig::default()
    });
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate().context("invalid dashboard configuration")?;

    info!(
        provider = %config.provider_url,
        default_period = %config.default_period,
        ma_short = config.indicators.ma_short,
        ma_long = config.indicators.ma_long,
        rsi_period = config.indicators.rsi_period,
        "Configuration resolved"
    );

    // ── 2. Market data source ────────────────────────────────────────────
    let client = YahooClient::new(
        config.provider_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;

    // ── 3. Shared state ──────────────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, Arc::new(client)));

    // ── 4. API server ────────────────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("Dalal Lens shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    warn!("Shutdown signal received, stopping gracefully");
}
