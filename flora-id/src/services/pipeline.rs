//! Identification pipeline
//!
//! One image in, one composed answer out:
//!
//! ```text
//! image → local inference → confidence gate ─accept──────────────┐
//!                                  └─reject→ cloud vision ─found─┤
//!                                                  └─absent→ Exhausted
//!                                      resolved name → enrichment → compose
//! ```
//!
//! Calls are sequential and each is attempted once. Only exhaustion of both
//! identification sources reaches the caller; every other failure degrades
//! the answer instead.

use std::sync::Arc;
use thiserror::Error;

use flora_common::api::IdentificationResult;

use super::cloud_vision::{identify_by_vision, VisionProvider};
use super::composer::{compose, Resolution};
use super::confidence_gate;
use super::enrichment::{enrich, EnrichmentPayload, InfoProvider};
use super::image_input::{preprocess, SubmittedImage};
use super::inference::{InferenceEngine, InferenceError, InferenceOutcome};
use super::resource_loader::SpeciesCatalog;

/// Request-fatal pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Local result rejected and the cloud returned nothing
    #[error("Identification failed.")]
    Exhausted,
}

/// Everything a request needs, built once at startup
pub struct IdentificationPipeline {
    catalog: Arc<SpeciesCatalog>,
    engine: Arc<dyn InferenceEngine>,
    vision: Arc<dyn VisionProvider>,
    info: Arc<dyn InfoProvider>,
}

impl IdentificationPipeline {
    pub fn new(
        catalog: Arc<SpeciesCatalog>,
        engine: Arc<dyn InferenceEngine>,
        vision: Arc<dyn VisionProvider>,
        info: Arc<dyn InfoProvider>,
    ) -> Self {
        Self {
            catalog,
            engine,
            vision,
            info,
        }
    }

    pub fn catalog(&self) -> &SpeciesCatalog {
        &self.catalog
    }

    /// Identify the flower in `image` and describe it
    pub async fn identify(
        &self,
        image: &SubmittedImage,
    ) -> Result<IdentificationResult, PipelineError> {
        let attempt = self.run_local(image).await;
        let local = confidence_gate::accept(attempt.as_ref(), &self.catalog).into_accepted();

        let cloud = match local {
            Some(_) => None,
            None => {
                tracing::info!("Local identification unusable, asking cloud vision");
                identify_by_vision(self.vision.as_ref(), image.base64()).await
            }
        };

        let Some(resolution) = Resolution::select(local, cloud) else {
            tracing::warn!("Local and cloud identification both failed");
            return Err(PipelineError::Exhausted);
        };

        tracing::info!(
            name = %resolution.name(),
            source = resolution.source(),
            "Species resolved, generating info"
        );
        let raw = enrich(self.info.as_ref(), resolution.name()).await;
        let (payload, payload_source) = EnrichmentPayload::parse(Some(raw.as_str()));
        tracing::debug!(payload_source = ?payload_source, "Enrichment parsed");

        Ok(compose(&resolution, payload))
    }

    /// Run the local classifier on the blocking pool
    ///
    /// Engine panics and join failures are reported as inference errors so
    /// the gate can reject and the cloud path can run.
    async fn run_local(&self, image: &SubmittedImage) -> Result<InferenceOutcome, InferenceError> {
        if !self.engine.is_available() {
            return Err(InferenceError::Unavailable);
        }

        let engine = Arc::clone(&self.engine);
        let pixels = image.image().clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let tensor = preprocess(&pixels)?;
            engine.infer(&tensor)
        })
        .await
        .map_err(|e| InferenceError::Failed(format!("inference task failed: {}", e)))
        .and_then(|result| result);

        match &outcome {
            Ok(outcome) => tracing::info!(
                class_index = outcome.class_index,
                confidence = outcome.confidence,
                "Local inference"
            ),
            Err(e) => tracing::warn!(error = %e, "Local inference error"),
        }

        outcome
    }
}
