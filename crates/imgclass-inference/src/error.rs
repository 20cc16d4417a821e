//! Error types for the inference layer.

use thiserror::Error;

/// Errors that can occur while preparing or running inference.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// Failed to load the model.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Failed to create an inference session on the selected device.
    #[error("failed to create session: {0}")]
    SessionCreate(String),

    /// Input buffer does not match its descriptor.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Device memory for a tensor could not be allocated.
    #[error("failed to allocate {requested} bytes of device memory ({in_use} bytes in use)")]
    Allocation { requested: usize, in_use: usize },

    /// The backend reported a failure during the forward computation.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// Output tensor extraction failed.
    #[error("failed to extract output: {0}")]
    OutputExtraction(String),

    /// I/O error when loading model files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
