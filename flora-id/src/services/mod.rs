//! Service modules for the identification pipeline
//!
//! Leaf-first: tables and image input, the inference capability, the
//! confidence gate, remote collaborators, enrichment, composition, and the
//! pipeline that runs them in order.

pub mod cloud_client;
pub mod cloud_vision;
pub mod composer;
pub mod confidence_gate;
pub mod enrichment;
pub mod image_input;
pub mod inference;
#[cfg(feature = "onnx")]
pub mod onnx_engine;
pub mod pipeline;
pub mod resource_loader;

pub use cloud_client::{CloudError, UnconfiguredProvider, ZhipuClient};
pub use cloud_vision::{CloudOutcome, VisionProvider, CLOUD_CONFIDENCE, CLOUD_SCIENTIFIC_NAME};
pub use composer::{compose, Resolution};
pub use confidence_gate::{AcceptedSpecies, GateDecision, RejectReason, ACCEPT_THRESHOLD_PERCENT};
pub use enrichment::{EnrichmentPayload, InfoProvider};
pub use image_input::{ImageInputError, ImageTensor, SubmittedImage};
pub use inference::{
    build_engine, Device, DisabledEngine, InferenceEngine, InferenceError, InferenceOutcome,
    MlStatus,
};
pub use pipeline::{IdentificationPipeline, PipelineError};
pub use resource_loader::{ClassIndexMap, LoadError, LoadedTables, SpeciesCatalog, SpeciesRecord};
