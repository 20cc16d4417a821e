//! Configuration structures for a classification run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use imgclass_inference::ModelInput;

use crate::error::{ClassifyError, Result};

/// Main configuration for the imgclass pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Candidate selection and failure policy.
    pub batch: BatchConfig,

    /// Device selection.
    pub device: DeviceConfig,

    /// Raster decoding limits.
    pub decoder: DecoderConfig,

    /// Model and backend configuration.
    pub model: ModelConfig,
}

/// Batch iteration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// File extensions (without the dot) that qualify as candidates.
    pub extensions: Vec<String>,

    /// Compare extensions byte-for-byte.
    pub case_sensitive: bool,

    /// Record per-file failures in the report and keep going.
    pub continue_on_error: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["tif".to_string(), "tiff".to_string()],
            case_sensitive: true,
            continue_on_error: false,
        }
    }
}

/// Device selection configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Index into the backend's device list.
    pub index: usize,

    /// Refuse to run on the host processor.
    pub require_accelerator: bool,

    /// Cap on live device memory in bytes.
    pub memory_limit_bytes: Option<usize>,
}

/// Decoder configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Largest allocation the image decoder may make, in bytes.
    pub max_image_bytes: Option<u64>,
}

/// Model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Number of classes the model scores. Fixed for the whole run.
    pub class_count: usize,

    /// Backend producing the scores.
    pub backend: BackendConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            class_count: 10,
            backend: BackendConfig::default(),
        }
    }
}

/// Inference backend selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Seeded uniform scores.
    Random {
        #[serde(default)]
        seed: u64,
    },

    /// The same scores for every image.
    Static { scores: Vec<f32> },

    /// ONNX model run with tract.
    Onnx {
        path: PathBuf,
        #[serde(default)]
        input: ModelInput,
    },

    /// ONNX model run with ONNX Runtime.
    Ort {
        path: PathBuf,
        #[serde(default)]
        input: ModelInput,
        #[serde(default = "default_use_cuda")]
        use_cuda: bool,
    },
}

fn default_use_cuda() -> bool {
    true
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Random { seed: 0 }
    }
}

impl ClassifyConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> std::result::Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.model.class_count == 0 {
            return Err(ClassifyError::Config("class_count must be at least 1".to_string()));
        }

        if self.batch.extensions.is_empty() {
            return Err(ClassifyError::Config(
                "at least one candidate extension is required".to_string(),
            ));
        }

        if let BackendConfig::Static { scores } = &self.model.backend {
            if scores.len() != self.model.class_count {
                return Err(ClassifyError::Config(format!(
                    "static backend has {} scores but class_count is {}",
                    scores.len(),
                    self.model.class_count
                )));
            }
        }

        Ok(())
    }
}
