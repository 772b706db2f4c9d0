//! flora-id - Flower identification service
//!
//! Identifies the flower in a submitted photo (local classifier first, remote
//! vision model as fallback) and returns it with generated descriptive text.
//!
//! Endpoints:
//! - `GET /health`
//! - `POST /identify`

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use flora_id::config::{log_filter_directive, resolve_api_key, Cli, ServiceConfig};
use flora_id::{build_router, AppState, BUILD_BACKEND};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let rust_log = std::env::var("RUST_LOG").ok();

    // Until the config file is read only RUST_LOG and the CLI level are known
    let early_level = cli.log_level.as_deref().unwrap_or("info");
    let (filter, filter_handle) = reload::Layer::new(EnvFilter::new(log_filter_directive(
        rust_log.as_deref(),
        early_level,
    )));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (config, toml_config) = ServiceConfig::load(&cli);

    let directive = log_filter_directive(rust_log.as_deref(), &config.log_level);
    if let Err(e) = filter_handle.reload(EnvFilter::new(&directive)) {
        warn!(error = %e, "Could not apply log level {}", directive);
    }

    info!(
        "Starting flora-id v{} [{}] built {} ({}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
        BUILD_BACKEND
    );
    tracing::debug!(?config, "Resolved configuration");

    let api_key = resolve_api_key(&toml_config, &config.api_key_file);
    let state = AppState::bootstrap(&config, api_key);

    info!(
        ml_available = state.ml_status.available,
        ml_error = state.ml_status.error.as_deref().unwrap_or("none"),
        device = %state.ml_status.device,
        flower_count = state.pipeline.catalog().len(),
        "Capabilities resolved"
    );

    let app = build_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Listening on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app).await?;

    Ok(())
}
