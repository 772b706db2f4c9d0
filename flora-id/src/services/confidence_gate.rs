//! Confidence Gate
//!
//! Accepts or rejects a local inference result. A result is accepted only when
//! local inference ran, `confidence * 100 >= 70`, and the class index resolves
//! to a species in the table. Pure function: no side effects besides logging,
//! never fails (any fault is a rejection).

use super::inference::{InferenceError, InferenceOutcome};
use super::resource_loader::{SpeciesCatalog, SpeciesRecord};

/// Minimum confidence, in percent, for a local result to be used
pub const ACCEPT_THRESHOLD_PERCENT: f64 = 70.0;

/// Why a local result was not used
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Engine not loaded, or the call failed
    Unavailable,
    /// Confidence below threshold (or not a number)
    BelowThreshold { confidence: f64 },
    /// Class index outside the class map
    UnknownClass { class_index: usize },
    /// Class map names a species missing from the table
    UnknownSpecies { species_id: String },
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Unavailable => "unavailable",
            RejectReason::BelowThreshold { .. } => "below_threshold",
            RejectReason::UnknownClass { .. } => "unknown_class",
            RejectReason::UnknownSpecies { .. } => "unknown_species",
        }
    }
}

/// Accepted local identification
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedSpecies {
    pub species: SpeciesRecord,
    /// Confidence exactly as the engine reported it
    pub confidence: f64,
}

/// Gate decision
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Accepted(AcceptedSpecies),
    Rejected(RejectReason),
}

impl GateDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, GateDecision::Accepted(_))
    }

    pub fn into_accepted(self) -> Option<AcceptedSpecies> {
        match self {
            GateDecision::Accepted(accepted) => Some(accepted),
            GateDecision::Rejected(_) => None,
        }
    }
}

/// Decide whether a local inference attempt is usable
pub fn accept(
    attempt: Result<&InferenceOutcome, &InferenceError>,
    catalog: &SpeciesCatalog,
) -> GateDecision {
    let decision = evaluate(attempt, catalog);

    match &decision {
        GateDecision::Accepted(accepted) => tracing::info!(
            species_id = %accepted.species.species_id,
            name = %accepted.species.local_name,
            confidence = accepted.confidence,
            "Local match accepted"
        ),
        GateDecision::Rejected(reason) => tracing::info!(
            reason = reason.as_str(),
            detail = ?reason,
            "Local match rejected"
        ),
    }

    decision
}

fn evaluate(
    attempt: Result<&InferenceOutcome, &InferenceError>,
    catalog: &SpeciesCatalog,
) -> GateDecision {
    let outcome = match attempt {
        Ok(outcome) => outcome,
        Err(_) => return GateDecision::Rejected(RejectReason::Unavailable),
    };

    let confidence = outcome.confidence;
    if confidence.is_nan() || confidence * 100.0 < ACCEPT_THRESHOLD_PERCENT {
        return GateDecision::Rejected(RejectReason::BelowThreshold { confidence });
    }

    let Some(species_id) = catalog.species_id_for(outcome.class_index) else {
        return GateDecision::Rejected(RejectReason::UnknownClass {
            class_index: outcome.class_index,
        });
    };

    match catalog.species(species_id) {
        Some(species) => GateDecision::Accepted(AcceptedSpecies {
            species: species.clone(),
            confidence,
        }),
        None => GateDecision::Rejected(RejectReason::UnknownSpecies {
            species_id: species_id.to_string(),
        }),
    }
}
