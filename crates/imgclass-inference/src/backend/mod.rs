//! Inference backend implementations.

mod fixed;
mod random;

#[cfg(feature = "ort")]
pub mod ort;

#[cfg(feature = "tract")]
pub mod tract;

pub use fixed::StaticBackend;
pub use random::RandomBackend;

use serde::{Deserialize, Serialize};

use crate::{Result, TensorDescriptor, TensorLayout};

/// Kind of compute device a backend can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// The host processor.
    Cpu,
    /// An NVIDIA GPU reached through CUDA.
    Cuda,
}

impl DeviceKind {
    /// Whether this device is distinct from the host processor.
    pub fn is_accelerator(self) -> bool {
        !matches!(self, DeviceKind::Cpu)
    }
}

/// A device reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Position in the backend's device list.
    pub index: usize,
    pub kind: DeviceKind,
    pub name: String,
    /// Compute capability (major, minor), when the device reports one.
    pub compute_capability: Option<(u32, u32)>,
}

impl DeviceInfo {
    /// The host processor at the given list position.
    pub fn host(index: usize) -> Self {
        Self {
            index,
            kind: DeviceKind::Cpu,
            name: "cpu".to_string(),
            compute_capability: None,
        }
    }
}

/// Fixed input geometry a model was exported with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInput {
    pub layout: TensorLayout,
    pub height: usize,
    pub width: usize,
}

impl ModelInput {
    /// Model input shape for a single three-channel image.
    pub fn shape(&self) -> [usize; 4] {
        match self.layout {
            TensorLayout::Nhwc => [1, self.height, self.width, 3],
            TensorLayout::Nchw => [1, 3, self.height, self.width],
        }
    }
}

impl Default for ModelInput {
    fn default() -> Self {
        Self {
            layout: TensorLayout::Nchw,
            height: 224,
            width: 224,
        }
    }
}

/// Trait for inference backends.
///
/// A backend is the runtime handle an accelerator context owns. It reports
/// the devices it can reach, binds to one of them, and turns an input buffer
/// into a buffer of class scores. The forward computation itself is entirely
/// the backend's business.
pub trait InferenceBackend: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Devices this backend can execute on.
    fn devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Prepare the runtime on `device`. Called once before any `run`.
    fn bind(&mut self, _device: &DeviceInfo) -> Result<()> {
        Ok(())
    }

    /// Run the forward computation.
    ///
    /// # Arguments
    /// * `input` - Buffer laid out as described by `input_desc`
    /// * `input_desc` - Shape and layout of `input`
    /// * `output_desc` - Shape of the expected score buffer
    ///
    /// # Returns
    /// One score per element of `output_desc`
    fn run(
        &self,
        input: &[f32],
        input_desc: &TensorDescriptor,
        output_desc: &TensorDescriptor,
    ) -> Result<Vec<f32>>;
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        (**self).devices()
    }

    fn bind(&mut self, device: &DeviceInfo) -> Result<()> {
        (**self).bind(device)
    }

    fn run(
        &self,
        input: &[f32],
        input_desc: &TensorDescriptor,
        output_desc: &TensorDescriptor,
    ) -> Result<Vec<f32>> {
        (**self).run(input, input_desc, output_desc)
    }
}
