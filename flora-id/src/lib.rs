//! flora-id library interface
//!
//! Exposes the application state, router, and services for the binary and
//! for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

/// Local inference backend compiled into this build (`onnx` or `cloud-only`)
pub const BUILD_BACKEND: &str = env!("BUILD_BACKEND");

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use flora_common::config::DEFAULT_MAX_IMAGE_BYTES;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::services::{
    build_engine, resource_loader, IdentificationPipeline, InfoProvider, MlStatus,
    SpeciesCatalog, UnconfiguredProvider, VisionProvider, ZhipuClient,
};

/// Application state shared across handlers
///
/// Everything is fixed at startup; handlers only read it.
#[derive(Clone)]
pub struct AppState {
    /// Tables, engine, and remote collaborators
    pub pipeline: Arc<IdentificationPipeline>,
    /// Local inference capability
    pub ml_status: MlStatus,
    /// Request body limit for `POST /identify`
    pub max_image_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: IdentificationPipeline, ml_status: MlStatus) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            ml_status,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            startup_time: Utc::now(),
        }
    }

    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    /// Build the state from resolved configuration
    ///
    /// Never fails. Missing or unusable tables and a missing model disable
    /// local inference; a missing credential disables the remote provider.
    /// Each is logged and reflected in `/health`. An unusable class list keeps
    /// the species table, so `flower_count` still reports it.
    pub fn bootstrap(config: &ServiceConfig, api_key: Option<String>) -> Self {
        tracing::info!(data_dir = %config.data_dir.display(), "Loading resources");

        let (catalog, engine, ml_status) = match resource_loader::load(&config.data_dir) {
            Ok(tables) => match tables.class_list_error {
                None => {
                    let (engine, status) = build_engine(&config.model_path, &tables.catalog);
                    (tables.catalog, engine, status)
                }
                Some(e) => {
                    tracing::error!(error = %e, "Class order unknown, running cloud-only");
                    (
                        tables.catalog,
                        Arc::new(services::DisabledEngine) as Arc<dyn services::InferenceEngine>,
                        MlStatus::unavailable(e.to_string()),
                    )
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "Species tables unavailable, running cloud-only");
                (
                    SpeciesCatalog::empty(),
                    Arc::new(services::DisabledEngine) as Arc<dyn services::InferenceEngine>,
                    MlStatus::unavailable(e.to_string()),
                )
            }
        };

        let (vision, info) = remote_providers(config, api_key);

        let pipeline = IdentificationPipeline::new(Arc::new(catalog), engine, vision, info);
        Self::new(pipeline, ml_status).with_max_image_bytes(config.max_image_bytes)
    }
}

fn remote_providers(
    config: &ServiceConfig,
    api_key: Option<String>,
) -> (Arc<dyn VisionProvider>, Arc<dyn InfoProvider>) {
    let Some(api_key) = api_key else {
        return (Arc::new(UnconfiguredProvider), Arc::new(UnconfiguredProvider));
    };

    match ZhipuClient::new(api_key, config.cloud.clone()) {
        Ok(client) => {
            tracing::info!(
                vision_model = %config.cloud.vision_model,
                text_model = %config.cloud.text_model,
                "Remote provider configured"
            );
            let client = Arc::new(client);
            let vision: Arc<dyn VisionProvider> = client.clone();
            let info: Arc<dyn InfoProvider> = client;
            (vision, info)
        }
        Err(e) => {
            tracing::error!(error = %e, "Remote provider client could not be built");
            (Arc::new(UnconfiguredProvider), Arc::new(UnconfiguredProvider))
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_image_bytes;

    Router::new()
        .merge(api::health_routes())
        .merge(api::identify_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_backend_matches_features() {
        let expected = if cfg!(feature = "onnx") { "onnx" } else { "cloud-only" };
        assert_eq!(BUILD_BACKEND, expected);
    }
}
