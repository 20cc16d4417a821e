//! Tract backend for pure-Rust ONNX inference.

use std::path::Path;

use tract_onnx::prelude::*;
use tracing::debug;

use crate::error::InferenceError;
use crate::tensor::reshape_for_model;
use crate::{DeviceInfo, InferenceBackend, ModelInput, Result, TensorDescriptor};

type TractPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Backend running an ONNX classification model with Tract on the host.
pub struct TractBackend {
    model: TractPlan,
    input: ModelInput,
}

impl TractBackend {
    /// Load a model from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P, input: ModelInput) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading ONNX model with Tract from: {}", path.display());

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to load model: {}", e)))?;

        Self::plan(model, input)
    }

    /// Load a model from bytes.
    pub fn from_bytes(bytes: &[u8], input: ModelInput) -> Result<Self> {
        debug!("Loading ONNX model with Tract from {} bytes", bytes.len());

        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to load model: {}", e)))?;

        Self::plan(model, input)
    }

    fn plan(mut model: InferenceModel, input: ModelInput) -> Result<Self> {
        // Pin the input to a concrete shape so the plan can be optimized
        model
            .set_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), input.shape()))
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to set input shape: {}", e)))?;

        let model = model
            .into_typed()
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to type model: {}", e)))?
            .into_optimized()
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to optimize: {}", e)))?
            .into_runnable()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;

        Ok(Self { model, input })
    }
}

impl InferenceBackend for TractBackend {
    fn name(&self) -> &str {
        "tract"
    }

    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(vec![DeviceInfo::host(0)])
    }

    fn run(
        &self,
        input: &[f32],
        input_desc: &TensorDescriptor,
        output_desc: &TensorDescriptor,
    ) -> Result<Vec<f32>> {
        let arr = reshape_for_model(
            input,
            input_desc,
            self.input.layout,
            self.input.height,
            self.input.width,
        )?;

        let shape: Vec<usize> = arr.shape().to_vec();
        let data: Vec<f32> = arr.iter().copied().collect();
        let tract_tensor = tract_ndarray::ArrayD::from_shape_vec(tract_ndarray::IxDyn(&shape), data)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))?;

        let outputs = self
            .model
            .run(tvec!(tract_tensor.into_tvalue()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::OutputExtraction("model produced no outputs".to_string()))?;

        let scores: Vec<f32> = output
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?
            .iter()
            .copied()
            .collect();

        if scores.len() != output_desc.element_count() {
            return Err(InferenceError::OutputExtraction(format!(
                "model produced {} scores, expected {}",
                scores.len(),
                output_desc.element_count()
            )));
        }

        Ok(scores)
    }
}
