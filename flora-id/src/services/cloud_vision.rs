//! Cloud Vision Fallback
//!
//! Used only when the confidence gate rejects the local result. A remote
//! identification is trusted as if it had confidence 0.999; it carries no
//! foreign name.

use async_trait::async_trait;

use super::cloud_client::CloudError;

/// Confidence reported for a remote identification
pub const CLOUD_CONFIDENCE: f64 = 0.999;

/// `scientificName` value marking a remote-only identification
pub const CLOUD_SCIENTIFIC_NAME: &str = "Identified by Cloud API";

/// Remote identification result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudOutcome {
    pub name: String,
    /// Short description; may be empty
    pub description: String,
}

/// Remote image identification
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Identify the flower in a base64 image (no data-URL header)
    async fn identify(&self, image_base64: &str) -> Result<CloudOutcome, CloudError>;
}

/// Ask the remote provider, absorbing every failure
///
/// Returns `None` on any transport, auth, or parse failure, and when the
/// provider answers with a blank name. The caller treats `None` as terminal.
pub async fn identify_by_vision(
    provider: &dyn VisionProvider,
    image_base64: &str,
) -> Option<CloudOutcome> {
    match provider.identify(image_base64).await {
        Ok(outcome) if !outcome.name.trim().is_empty() => {
            tracing::info!(name = %outcome.name, "Cloud match");
            Some(CloudOutcome {
                name: outcome.name.trim().to_string(),
                description: outcome.description.trim().to_string(),
            })
        }
        Ok(_) => {
            tracing::warn!("Cloud identification returned a blank name");
            None
        }
        Err(CloudError::NotConfigured) => {
            tracing::warn!("Cloud identification skipped: provider not configured");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "Cloud identification failed");
            None
        }
    }
}
