//! Response Composer
//!
//! Merges the resolved species and the enrichment payload into the final
//! [`IdentificationResult`].
//!
//! Priority:
//! 1. An accepted local result is authoritative (name, foreign name,
//!    confidence); its description starts blank.
//! 2. Otherwise the cloud result is authoritative: sentinel scientific name,
//!    confidence 0.999, description from the cloud.
//! 3. With neither there is nothing to compose; [`Resolution::select`] returns
//!    `None` and the pipeline reports exhaustion.
//! 4. Description: enrichment's if non-blank, else the one from 1/2 if
//!    non-blank, else a templated sentence using the name.
//! 5. Poetry, botany, care, culture come from the enrichment verbatim.

use flora_common::api::IdentificationResult;

use super::cloud_vision::{CloudOutcome, CLOUD_CONFIDENCE, CLOUD_SCIENTIFIC_NAME};
use super::confidence_gate::AcceptedSpecies;
use super::enrichment::EnrichmentPayload;

/// The identification source that won
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Local(AcceptedSpecies),
    Cloud(CloudOutcome),
}

impl Resolution {
    /// Local result first, then cloud; `None` when both are absent
    pub fn select(local: Option<AcceptedSpecies>, cloud: Option<CloudOutcome>) -> Option<Self> {
        local
            .map(Resolution::Local)
            .or_else(|| cloud.map(Resolution::Cloud))
    }

    /// Resolved species name (used to request enrichment)
    pub fn name(&self) -> &str {
        match self {
            Resolution::Local(accepted) => &accepted.species.local_name,
            Resolution::Cloud(outcome) => &outcome.name,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Resolution::Local(_) => "local",
            Resolution::Cloud(_) => "cloud",
        }
    }
}

/// Sentence used when no description is available from any source
pub fn generic_description(name: &str) -> String {
    format!("{}，一种美丽的植物。", name)
}

/// Build the response
pub fn compose(resolution: &Resolution, enrichment: EnrichmentPayload) -> IdentificationResult {
    let (name, scientific_name, confidence, base_description) = match resolution {
        Resolution::Local(accepted) => (
            accepted.species.local_name.clone(),
            accepted.species.foreign_name.clone(),
            accepted.confidence,
            String::new(),
        ),
        Resolution::Cloud(outcome) => (
            outcome.name.clone(),
            CLOUD_SCIENTIFIC_NAME.to_string(),
            CLOUD_CONFIDENCE,
            outcome.description.clone(),
        ),
    };

    let EnrichmentPayload {
        poem,
        botany,
        description,
        care,
        culture,
    } = enrichment;

    let description = if !description.trim().is_empty() {
        description
    } else if !base_description.trim().is_empty() {
        base_description
    } else {
        generic_description(&name)
    };

    IdentificationResult {
        name,
        scientific_name,
        confidence,
        description,
        poetry: poem,
        botany,
        care,
        culture,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::resource_loader::SpeciesRecord;

    fn rose(confidence: f64) -> AcceptedSpecies {
        AcceptedSpecies {
            species: SpeciesRecord {
                species_id: "012".to_string(),
                local_name: "玫瑰".to_string(),
                foreign_name: "Rose".to_string(),
            },
            confidence,
        }
    }

    fn tulip(description: &str) -> CloudOutcome {
        CloudOutcome {
            name: "郁金香".to_string(),
            description: description.to_string(),
        }
    }

    fn payload(description: &str) -> EnrichmentPayload {
        EnrichmentPayload {
            poem: "poem".to_string(),
            botany: "botany".to_string(),
            description: description.to_string(),
            care: "care".to_string(),
            culture: "culture".to_string(),
        }
    }

    #[test]
    fn test_select_prefers_local() {
        let resolution = Resolution::select(Some(rose(0.9)), Some(tulip("x"))).unwrap();
        assert_eq!(resolution.name(), "玫瑰");
        assert_eq!(resolution.source(), "local");

        let resolution = Resolution::select(None, Some(tulip("x"))).unwrap();
        assert_eq!(resolution.name(), "郁金香");

        assert!(Resolution::select(None, None).is_none());
    }

    #[test]
    fn test_local_result_fields() {
        let result = compose(&Resolution::Local(rose(0.95)), payload(""));

        assert_eq!(result.name, "玫瑰");
        assert_eq!(result.scientific_name, "Rose");
        assert_eq!(result.confidence, 0.95);
        // Local path has no description of its own
        assert_eq!(result.description, generic_description("玫瑰"));
        assert_eq!(result.poetry, "poem");
        assert_eq!(result.care, "care");
    }

    #[test]
    fn test_cloud_result_fields() {
        let result = compose(&Resolution::Cloud(tulip("花中皇后")), EnrichmentPayload::default());

        assert_eq!(result.name, "郁金香");
        assert_eq!(result.scientific_name, CLOUD_SCIENTIFIC_NAME);
        assert_eq!(result.confidence, 0.999);
        assert_eq!(result.description, "花中皇后");
        assert_eq!(result.poetry, "");
        assert_eq!(result.culture, "");
    }

    #[test]
    fn test_enrichment_description_wins() {
        let result = compose(&Resolution::Cloud(tulip("花中皇后")), payload("来自百科"));
        assert_eq!(result.description, "来自百科");
    }

    #[test]
    fn test_description_never_blank() {
        for enrichment_description in ["", "   "] {
            for cloud_description in ["", " \n "] {
                let result = compose(
                    &Resolution::Cloud(tulip(cloud_description)),
                    payload(enrichment_description),
                );
                assert_eq!(result.description, "郁金香，一种美丽的植物。");
            }

            let result = compose(&Resolution::Local(rose(0.8)), payload(enrichment_description));
            assert!(!result.description.trim().is_empty());
        }
    }
}
