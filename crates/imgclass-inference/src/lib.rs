//! Inference backend abstraction for imgclass.
//!
//! This crate provides the contract the classification driver uses to reach
//! a model, together with a few implementations:
//! - `tract` for pure-Rust ONNX inference on the host (default feature)
//! - `ort` with CUDA or XNNPACK execution providers (feature `ort`)
//! - seeded random and static scorers for dry runs and tests

mod backend;
mod error;
mod tensor;

pub use backend::{
    DeviceInfo, DeviceKind, InferenceBackend, ModelInput, RandomBackend, StaticBackend,
};
pub use error::InferenceError;
pub use tensor::{reshape_for_model, TensorDescriptor, TensorLayout, TensorType};

#[cfg(feature = "ort")]
pub use backend::ort::OrtBackend;

#[cfg(feature = "tract")]
pub use backend::tract::TractBackend;

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
