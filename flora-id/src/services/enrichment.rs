//! Info Enrichment
//!
//! Turns a resolved species name into descriptive text: a poem, botany notes,
//! a short description, care instructions and cultural meaning.
//!
//! Two layers, neither of which can fail the request:
//! - [`enrich`] asks the provider for raw text. Provider failures become one of
//!   two fixed placeholder texts (not configured vs. call failed).
//! - [`EnrichmentPayload::parse`] turns raw text into the payload. Text that
//!   doesn't match the schema becomes a third fixed placeholder.

use async_trait::async_trait;
use serde::Deserialize;

use super::cloud_client::{strip_code_fences, CloudError};

/// Remote text generation
#[async_trait]
pub trait InfoProvider: Send + Sync {
    /// Generate the enrichment JSON text for a species
    async fn generate_info(&self, species_name: &str) -> Result<String, CloudError>;
}

/// Structured enrichment text
///
/// Every field defaults to blank. `care` is expected to hold four lines
/// (water/light/soil/temperature, ≤25 characters each); that format is asked
/// of the generator and not validated here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentPayload {
    pub poem: String,
    pub botany: String,
    pub description: String,
    pub care: String,
    pub culture: String,
}

/// Raw deserialization target: distinguishes "absent" from "blank"
#[derive(Debug, Deserialize)]
struct RawPayload {
    poem: Option<String>,
    botany: Option<String>,
    description: Option<String>,
    care: Option<String>,
    culture: Option<String>,
}

/// Where the payload came from (for logging)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    Generated,
    ParseFallback,
}

impl EnrichmentPayload {
    /// Parse generated text, falling back to [`EnrichmentPayload::parse_fallback`]
    ///
    /// Accepted: a JSON object (optionally inside markdown fences) whose
    /// recognized fields are strings, with at least one recognized field.
    /// Missing fields stay blank. Anything else is malformed.
    pub fn parse(raw: Option<&str>) -> (Self, PayloadSource) {
        match raw.and_then(Self::try_parse) {
            Some(payload) => (payload, PayloadSource::Generated),
            None => {
                tracing::warn!("Enrichment text malformed or absent, using placeholder");
                (Self::parse_fallback(), PayloadSource::ParseFallback)
            }
        }
    }

    fn try_parse(raw: &str) -> Option<Self> {
        let cleaned = strip_code_fences(raw);
        let parsed: RawPayload = serde_json::from_str(&cleaned).ok()?;

        let RawPayload {
            poem,
            botany,
            description,
            care,
            culture,
        } = parsed;

        if poem.is_none()
            && botany.is_none()
            && description.is_none()
            && care.is_none()
            && culture.is_none()
        {
            return None;
        }

        Some(Self {
            poem: poem.unwrap_or_default(),
            botany: botany.unwrap_or_default(),
            description: description.unwrap_or_default(),
            care: care.unwrap_or_default(),
            culture: culture.unwrap_or_default(),
        })
    }

    /// Placeholder used when generated text can't be parsed
    ///
    /// All five fields are populated.
    pub fn parse_fallback() -> Self {
        Self {
            poem: "花开有时，静待花期".to_string(),
            botany: "暂无该花卉的植物学资料".to_string(),
            description: "一种美丽的花卉。".to_string(),
            care: "水分：适量\n阳光：充足\n土壤：疏松\n温度：适宜".to_string(),
            culture: "每朵花都有独特的美".to_string(),
        }
    }
}

/// Placeholder text when no provider credential is configured
pub fn unavailable_placeholder(species_name: &str) -> String {
    placeholder_json(
        &format!("{}的详细信息暂时无法获取 (API Unavailable)", species_name),
        "水分：适量\n阳光：充足\n土壤：疏松\n温度：适宜",
        "每朵花都有独特的美",
    )
}

/// Placeholder text when the provider call failed
pub fn failure_placeholder(species_name: &str) -> String {
    placeholder_json(
        &format!("暂时无法获取{}的详细信息", species_name),
        "水分：见干见湿\n阳光：保持明亮\n土壤：排水良好\n温度：温暖舒适",
        "生命力顽强",
    )
}

fn placeholder_json(botany: &str, care: &str, culture: &str) -> String {
    serde_json::json!({
        "poem": "花开有时，静待花期",
        "botany": botany,
        "care": care,
        "culture": culture,
    })
    .to_string()
}

/// Ask the provider for enrichment text, absorbing every failure
///
/// Always returns text; on failure it is one of the two placeholders.
pub async fn enrich(provider: &dyn InfoProvider, species_name: &str) -> String {
    match provider.generate_info(species_name).await {
        Ok(text) => {
            tracing::info!(name = %species_name, "Enrichment generated");
            text
        }
        Err(CloudError::NotConfigured) => {
            tracing::warn!(name = %species_name, "Enrichment provider not configured");
            unavailable_placeholder(species_name)
        }
        Err(e) => {
            tracing::warn!(name = %species_name, error = %e, "Enrichment generation failed");
            failure_placeholder(species_name)
        }
    }
}
