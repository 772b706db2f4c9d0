//! Inference Engine capability
//!
//! The classifier network itself is a collaborator behind the
//! [`InferenceEngine`] trait: given a preprocessed tensor it returns a class
//! index and a confidence in [0, 1].
//!
//! Availability is decided once at startup by [`build_engine`]. When no engine
//! can be built a [`DisabledEngine`] is substituted and the reason is kept in
//! [`MlStatus`], so the request path never branches on "is there a model".

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use super::image_input::ImageTensor;
use super::resource_loader::SpeciesCatalog;

/// Per-call inference errors
///
/// Always recovered by the pipeline (the gate rejects and the cloud path runs).
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Local inference unavailable")]
    Unavailable,

    #[error("Inference failed: {0}")]
    Failed(String),

    #[error("Model output malformed: {0}")]
    MalformedOutput(String),
}

/// Engine construction errors (recorded as `ml_error`, never fatal)
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("File Not Found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("No local inference backend compiled in (build with --features onnx)")]
    BackendUnavailable,

    #[error("Model load failed: {0}")]
    LoadFailed(String),

    #[error("Model has {model} output classes but the class table has {table}")]
    WidthMismatch { model: usize, table: usize },
}

/// Result of one forward pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceOutcome {
    pub class_index: usize,
    /// Softmax probability of `class_index`, in [0, 1]
    pub confidence: f64,
}

/// Compute device selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    /// No engine loaded
    None,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::None => write!(f, "none"),
        }
    }
}

/// Local classifier
pub trait InferenceEngine: Send + Sync {
    /// Whether `infer` can succeed at all
    fn is_available(&self) -> bool {
        true
    }

    fn device(&self) -> Device;

    /// Number of output classes, if known
    fn num_classes(&self) -> Option<usize>;

    /// Run a forward pass. Blocking; call from a blocking-capable thread.
    fn infer(&self, input: &ImageTensor) -> Result<InferenceOutcome, InferenceError>;
}

/// Stand-in used whenever no engine could be built
#[derive(Debug, Default)]
pub struct DisabledEngine;

impl InferenceEngine for DisabledEngine {
    fn is_available(&self) -> bool {
        false
    }

    fn device(&self) -> Device {
        Device::None
    }

    fn num_classes(&self) -> Option<usize> {
        None
    }

    fn infer(&self, _input: &ImageTensor) -> Result<InferenceOutcome, InferenceError> {
        Err(InferenceError::Unavailable)
    }
}

/// Local inference capability, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MlStatus {
    pub available: bool,
    pub error: Option<String>,
    pub device: Device,
}

impl MlStatus {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            error: Some(reason.into()),
            device: Device::None,
        }
    }
}

/// Pick the top class from raw logits
///
/// Applies softmax, returns argmax and its probability. Non-finite logits or
/// an empty output are reported as malformed.
pub fn top_class(logits: &[f32]) -> Result<InferenceOutcome, InferenceError> {
    if logits.is_empty() {
        return Err(InferenceError::MalformedOutput("empty output".to_string()));
    }
    if logits.iter().any(|v| !v.is_finite()) {
        return Err(InferenceError::MalformedOutput("non-finite logit".to_string()));
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f64> = logits.iter().map(|&v| ((v - max) as f64).exp()).collect();
    let sum: f64 = exps.iter().sum();

    let (class_index, best) = exps
        .iter()
        .enumerate()
        .fold((0, f64::MIN), |acc, (i, &e)| if e > acc.1 { (i, e) } else { acc });

    Ok(InferenceOutcome {
        class_index,
        confidence: (best / sum).clamp(0.0, 1.0),
    })
}

/// Build the engine for this process
///
/// Never fails: any problem yields a [`DisabledEngine`] plus an [`MlStatus`]
/// explaining why. Also checks that the model's output width matches the
/// class table, since a mismatch would silently mislabel every result.
pub fn build_engine(
    model_path: &Path,
    catalog: &SpeciesCatalog,
) -> (Arc<dyn InferenceEngine>, MlStatus) {
    build_engine_with(load_backend, model_path, catalog)
}

/// [`build_engine`] with a caller-supplied backend loader
///
/// `loader` receives the model path and the expected class width.
pub fn build_engine_with<L>(
    loader: L,
    model_path: &Path,
    catalog: &SpeciesCatalog,
) -> (Arc<dyn InferenceEngine>, MlStatus)
where
    L: FnOnce(&Path, usize) -> Result<Arc<dyn InferenceEngine>, EngineError>,
{
    let width = catalog.class_width();

    let engine = match loader(model_path, width) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::warn!(error = %e, "Local inference disabled");
            return (Arc::new(DisabledEngine), MlStatus::unavailable(e.to_string()));
        }
    };

    if let Err(e) = check_width(engine.as_ref(), width) {
        tracing::error!(error = %e, "Local inference disabled");
        return (Arc::new(DisabledEngine), MlStatus::unavailable(e.to_string()));
    }

    let status = MlStatus {
        available: engine.is_available(),
        error: None,
        device: engine.device(),
    };
    tracing::info!(device = %status.device, num_classes = width, "Local inference ready");
    (engine, status)
}

/// Model output width must equal the class table width
pub fn check_width(engine: &dyn InferenceEngine, table: usize) -> Result<(), EngineError> {
    match engine.num_classes() {
        Some(model) if model != table => Err(EngineError::WidthMismatch { model, table }),
        _ => Ok(()),
    }
}

#[cfg(feature = "onnx")]
fn load_backend(
    model_path: &Path,
    num_classes: usize,
) -> Result<Arc<dyn InferenceEngine>, EngineError> {
    if !model_path.exists() {
        return Err(EngineError::ArtifactMissing(model_path.to_path_buf()));
    }
    tracing::info!(path = %model_path.display(), num_classes, "Loading model");
    let engine = super::onnx_engine::OnnxEngine::load(model_path)?;
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "onnx"))]
fn load_backend(
    model_path: &Path,
    _num_classes: usize,
) -> Result<Arc<dyn InferenceEngine>, EngineError> {
    if !model_path.exists() {
        return Err(EngineError::ArtifactMissing(model_path.to_path_buf()));
    }
    Err(EngineError::BackendUnavailable)
}
