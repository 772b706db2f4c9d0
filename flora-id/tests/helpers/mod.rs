//! Shared fixtures for flora-id integration tests
//!
//! Fake engines and remote providers with call counters, a tiny PNG encoder,
//! and catalog builders.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use flora_id::services::{
    ClassIndexMap, CloudError, CloudOutcome, Device, DisabledEngine, IdentificationPipeline,
    ImageTensor, InferenceEngine, InferenceError, InferenceOutcome, InfoProvider, MlStatus,
    SpeciesCatalog, SpeciesRecord, VisionProvider,
};
use flora_id::AppState;

// ============================================================================
// Images
// ============================================================================

/// Base64 of a solid-colour PNG
pub fn png_base64(width: u32, height: u32) -> String {
    let img = RgbImage::from_pixel(width, height, Rgb([230, 120, 160]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

// ============================================================================
// Catalogs
// ============================================================================

pub fn record(species_id: &str, local_name: &str, foreign_name: &str) -> SpeciesRecord {
    SpeciesRecord {
        species_id: species_id.to_string(),
        local_name: local_name.to_string(),
        foreign_name: foreign_name.to_string(),
    }
}

/// Three species; class 0 → "001", class 1 → "012", class 2 → "045"
pub fn sample_catalog() -> SpeciesCatalog {
    let species: BTreeMap<String, SpeciesRecord> = [
        record("001", "百合", "Lily"),
        record("012", "玫瑰", "Rose"),
        record("045", "向日葵", "Sunflower"),
    ]
    .into_iter()
    .map(|r| (r.species_id.clone(), r))
    .collect();

    let classes = ClassIndexMap::explicit(vec![
        "001".to_string(),
        "012".to_string(),
        "045".to_string(),
    ]);

    SpeciesCatalog::new(species, classes)
}

/// Write `flower_names.json` and `classes.json` for [`sample_catalog`]'s species
pub fn write_sample_tables(dir: &Path) {
    std::fs::write(
        dir.join("flower_names.json"),
        r#"{
            "001": {"localName": "百合", "foreignName": "Lily"},
            "012": {"localName": "玫瑰", "foreignName": "Rose"},
            "045": {"localName": "向日葵", "foreignName": "Sunflower"}
        }"#,
    )
    .unwrap();
    std::fs::write(dir.join("classes.json"), r#"["001", "012", "045"]"#).unwrap();
}

// ============================================================================
// Engines
// ============================================================================

/// Engine that always reports the same outcome
pub struct FixedEngine {
    pub outcome: InferenceOutcome,
    pub calls: AtomicUsize,
}

impl FixedEngine {
    pub fn new(class_index: usize, confidence: f64) -> Arc<Self> {
        Arc::new(Self {
            outcome: InferenceOutcome {
                class_index,
                confidence,
            },
            calls: AtomicUsize::new(0),
        })
    }
}

impl InferenceEngine for FixedEngine {
    fn device(&self) -> Device {
        Device::Cpu
    }

    fn num_classes(&self) -> Option<usize> {
        None
    }

    fn infer(&self, input: &ImageTensor) -> Result<InferenceOutcome, InferenceError> {
        assert_eq!(input.shape(), [1, 3, 224, 224]);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.outcome)
    }
}

/// Engine whose forward pass always errors
pub struct FailingEngine;

impl InferenceEngine for FailingEngine {
    fn device(&self) -> Device {
        Device::Cpu
    }

    fn num_classes(&self) -> Option<usize> {
        None
    }

    fn infer(&self, _input: &ImageTensor) -> Result<InferenceOutcome, InferenceError> {
        Err(InferenceError::Failed("simulated runtime error".to_string()))
    }
}

pub fn disabled_engine() -> Arc<dyn InferenceEngine> {
    Arc::new(DisabledEngine)
}

// ============================================================================
// Remote providers
// ============================================================================

/// Vision provider with a scripted answer
pub struct FakeVision {
    answer: Option<(String, String)>,
    pub calls: AtomicUsize,
}

impl FakeVision {
    /// Always identifies `name` with `description`
    pub fn found(name: &str, description: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some((name.to_string(), description.to_string())),
            calls: AtomicUsize::new(0),
        })
    }

    /// Always fails
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionProvider for FakeVision {
    async fn identify(&self, image_base64: &str) -> Result<CloudOutcome, CloudError> {
        assert!(!image_base64.starts_with("data:"), "header must be stripped");
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Some((name, description)) => Ok(CloudOutcome {
                name: name.clone(),
                description: description.clone(),
            }),
            None => Err(CloudError::Network("connection refused".to_string())),
        }
    }
}

/// Info provider with a scripted answer
pub struct FakeInfo {
    answer: Result<String, FakeInfoFailure>,
    pub calls: AtomicUsize,
}

#[derive(Clone, Copy)]
pub enum FakeInfoFailure {
    NotConfigured,
    Api,
}

impl FakeInfo {
    pub fn text(text: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(failure: FakeInfoFailure) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(failure),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InfoProvider for FakeInfo {
    async fn generate_info(&self, _species_name: &str) -> Result<String, CloudError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Ok(text) => Ok(text.clone()),
            Err(FakeInfoFailure::NotConfigured) => Err(CloudError::NotConfigured),
            Err(FakeInfoFailure::Api) => Err(CloudError::Api(500, "boom".to_string())),
        }
    }
}

/// Well-formed enrichment text
pub const FULL_INFO: &str = r#"{
    "poem": "一枝红艳露凝香",
    "botany": "蔷薇科蔷薇属",
    "description": "花色艳丽，香气浓郁",
    "care": "水分：适量\n阳光：充足\n土壤：疏松\n温度：15-25℃",
    "culture": "象征爱情"
}"#;

// ============================================================================
// Pipelines and state
// ============================================================================

pub fn pipeline(
    engine: Arc<dyn InferenceEngine>,
    vision: Arc<dyn VisionProvider>,
    info: Arc<dyn InfoProvider>,
) -> IdentificationPipeline {
    IdentificationPipeline::new(Arc::new(sample_catalog()), engine, vision, info)
}

pub fn ml_ready() -> MlStatus {
    MlStatus {
        available: true,
        error: None,
        device: Device::Cpu,
    }
}

pub fn app_state(
    engine: Arc<dyn InferenceEngine>,
    vision: Arc<dyn VisionProvider>,
    info: Arc<dyn InfoProvider>,
    ml_status: MlStatus,
) -> AppState {
    AppState::new(pipeline(engine, vision, info), ml_status)
}
