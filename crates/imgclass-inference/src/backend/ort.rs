//! ONNX Runtime (ort) backend with CUDA and XNNPACK execution providers.

use std::path::Path;
use std::sync::Mutex;

use ort::ep::{ExecutionProvider, CUDA, XNNPACK};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, warn};

use crate::error::InferenceError;
use crate::tensor::reshape_for_model;
use crate::{DeviceInfo, DeviceKind, InferenceBackend, ModelInput, Result, TensorDescriptor};

/// Backend using ONNX Runtime.
///
/// The session is only created once the backend is bound to a device, so the
/// execution provider matches the device the accelerator context picked.
pub struct OrtBackend {
    model: Vec<u8>,
    input: ModelInput,
    use_cuda: bool,
    session: Option<Mutex<Session>>,
    input_name: String,
}

impl OrtBackend {
    /// Load a model from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P, input: ModelInput, use_cuda: bool) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading ONNX model from: {}", path.display());

        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(bytes, input, use_cuda))
    }

    /// Wrap model bytes; nothing is parsed until `bind`.
    pub fn from_bytes(model: Vec<u8>, input: ModelInput, use_cuda: bool) -> Self {
        Self {
            model,
            input,
            use_cuda,
            session: None,
            input_name: String::new(),
        }
    }

    fn cuda_available(&self) -> bool {
        if !self.use_cuda {
            return false;
        }
        match CUDA::default().is_available() {
            Ok(available) => available,
            Err(e) => {
                warn!("Could not query CUDA execution provider: {}", e);
                false
            }
        }
    }
}

impl InferenceBackend for OrtBackend {
    fn name(&self) -> &str {
        "ort"
    }

    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        let mut devices = Vec::with_capacity(2);
        if self.cuda_available() {
            devices.push(DeviceInfo {
                index: 0,
                kind: DeviceKind::Cuda,
                name: "cuda:0".to_string(),
                compute_capability: None,
            });
        }
        devices.push(DeviceInfo::host(devices.len()));
        Ok(devices)
    }

    fn bind(&mut self, device: &DeviceInfo) -> Result<()> {
        let builder = Session::builder()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;

        let builder = match device.kind {
            DeviceKind::Cuda => builder.with_execution_providers([CUDA::default().build()]),
            DeviceKind::Cpu => builder.with_execution_providers([XNNPACK::default().build()]),
        }
        .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .commit_from_memory(&self.model)
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;

        self.input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| InferenceError::ModelLoad("model declares no inputs".to_string()))?;

        debug!("ONNX Runtime session bound to {} (input '{}')", device.name, self.input_name);
        self.session = Some(Mutex::new(session));
        Ok(())
    }

    fn run(
        &self,
        input: &[f32],
        input_desc: &TensorDescriptor,
        output_desc: &TensorDescriptor,
    ) -> Result<Vec<f32>> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| InferenceError::SessionCreate("backend is not bound to a device".to_string()))?;

        let arr = reshape_for_model(
            input,
            input_desc,
            self.input.layout,
            self.input.height,
            self.input.width,
        )?;
        let shape: Vec<i64> = arr.shape().iter().map(|&s| s as i64).collect();
        let data: Vec<f32> = arr.iter().copied().collect();
        let value: ort::session::SessionInputValue<'static> = Tensor::from_array((shape, data))
            .map(Into::into)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))?;

        let mut session = session
            .lock()
            .map_err(|e| InferenceError::InferenceFailed(format!("Failed to lock session: {}", e)))?;

        let outputs = session
            .run(vec![(self.input_name.as_str(), value)])
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let (_, output) = outputs
            .iter()
            .next()
            .ok_or_else(|| InferenceError::OutputExtraction("model produced no outputs".to_string()))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;

        if data.len() != output_desc.element_count() {
            return Err(InferenceError::OutputExtraction(format!(
                "model produced {} scores, expected {}",
                data.len(),
                output_desc.element_count()
            )));
        }

        Ok(data.to_vec())
    }
}
