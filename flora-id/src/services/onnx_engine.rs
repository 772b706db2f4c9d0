//! ONNX classifier backend (CPU, tract)
//!
//! Loads the exported classifier once and runs one forward pass per request.
//! The graph is optimized for a fixed `[1, 3, 224, 224]` input.

use std::path::Path;

use tract_onnx::prelude::*;

use super::image_input::{ImageTensor, CROP_SIZE};
use super::inference::{
    top_class, Device, EngineError, InferenceEngine, InferenceError, InferenceOutcome,
};

type Plan = TypedRunnableModel<TypedModel>;

pub struct OnnxEngine {
    plan: Plan,
    num_classes: Option<usize>,
}

impl OnnxEngine {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let side = CROP_SIZE as usize;
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, 3, side, side]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| EngineError::LoadFailed(e.to_string()))?;

        // Output fact is [1, num_classes] for a classification head
        let num_classes = plan
            .model()
            .output_fact(0)
            .ok()
            .and_then(|fact| fact.shape.as_concrete().map(|dims| dims.to_vec()))
            .and_then(|dims| dims.last().copied());

        Ok(Self { plan, num_classes })
    }
}

impl InferenceEngine for OnnxEngine {
    fn device(&self) -> Device {
        Device::Cpu
    }

    fn num_classes(&self) -> Option<usize> {
        self.num_classes
    }

    fn infer(&self, input: &ImageTensor) -> Result<InferenceOutcome, InferenceError> {
        let shape = input.shape();
        let tensor: Tensor = tract_ndarray::Array4::from_shape_vec(
            (shape[0], shape[1], shape[2], shape[3]),
            input.data().to_vec(),
        )
        .map_err(|e| InferenceError::Failed(e.to_string()))?
        .into();

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::Failed(e.to_string()))?;

        let first = outputs
            .first()
            .ok_or_else(|| InferenceError::MalformedOutput("no outputs".to_string()))?;
        let logits = first
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::MalformedOutput(e.to_string()))?;

        let logits: Vec<f32> = logits.iter().copied().collect();
        top_class(&logits)
    }
}
