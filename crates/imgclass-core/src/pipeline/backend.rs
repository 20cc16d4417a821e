//! Construct the configured inference backend.

use tracing::debug;

use imgclass_inference::{InferenceBackend, RandomBackend, StaticBackend};

use crate::error::{ClassifyError, Result};
use crate::models::config::{BackendConfig, ModelConfig};

/// Build the backend selected in `config`.
pub fn create_backend(config: &ModelConfig) -> Result<Box<dyn InferenceBackend>> {
    match &config.backend {
        BackendConfig::Random { seed } => {
            debug!("Using random backend with seed {}", seed);
            Ok(Box::new(RandomBackend::new(*seed)))
        }
        BackendConfig::Static { scores } => {
            debug!("Using static backend with {} scores", scores.len());
            Ok(Box::new(StaticBackend::new(scores.clone())))
        }
        BackendConfig::Onnx { path, input } => create_tract(path, *input),
        BackendConfig::Ort {
            path,
            input,
            use_cuda,
        } => create_ort(path, *input, *use_cuda),
    }
}

#[cfg(feature = "tract")]
fn create_tract(
    path: &std::path::Path,
    input: imgclass_inference::ModelInput,
) -> Result<Box<dyn InferenceBackend>> {
    let backend = imgclass_inference::TractBackend::from_file(path, input)
        .map_err(|e| ClassifyError::DeviceUnavailable(format!("failed to load {}: {}", path.display(), e)))?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "tract"))]
fn create_tract(
    _path: &std::path::Path,
    _input: imgclass_inference::ModelInput,
) -> Result<Box<dyn InferenceBackend>> {
    Err(ClassifyError::Config(
        "the onnx backend requires the `tract` feature".to_string(),
    ))
}

#[cfg(feature = "ort")]
fn create_ort(
    path: &std::path::Path,
    input: imgclass_inference::ModelInput,
    use_cuda: bool,
) -> Result<Box<dyn InferenceBackend>> {
    let backend = imgclass_inference::OrtBackend::from_file(path, input, use_cuda)
        .map_err(|e| ClassifyError::DeviceUnavailable(format!("failed to load {}: {}", path.display(), e)))?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "ort"))]
fn create_ort(
    _path: &std::path::Path,
    _input: imgclass_inference::ModelInput,
    _use_cuda: bool,
) -> Result<Box<dyn InferenceBackend>> {
    Err(ClassifyError::Config(
        "the ort backend requires the `ort` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_backend_from_config() {
        let config = ModelConfig {
            class_count: 2,
            backend: BackendConfig::Static {
                scores: vec![0.25, 0.75],
            },
        };
        let backend = create_backend(&config).unwrap();
        assert_eq!(backend.name(), "static");
    }

    #[test]
    fn test_missing_model_file() {
        let config = ModelConfig {
            class_count: 2,
            backend: BackendConfig::Onnx {
                path: "does/not/exist.onnx".into(),
                input: Default::default(),
            },
        };
        assert!(create_backend(&config).is_err());
    }
}
