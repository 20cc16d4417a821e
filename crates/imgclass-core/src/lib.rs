//! Core library for batch image classification.
//!
//! This crate provides:
//! - An accelerator context owning the device and inference runtime
//! - Raster decoding into normalized RGB tensors
//! - Tensor descriptors and the inference invocation contract
//! - Plain-text classification reports
//! - A sequential batch pipeline over a directory of images

pub mod error;
pub mod models;
pub mod pipeline;

pub use error::{ClassifyError, DecodeError, Result};
pub use models::config::ClassifyConfig;
pub use pipeline::{
    AcceleratorContext, BatchSummary, FileOutcome, FileStatus, ImageTensor, Pipeline,
    RasterDecoder, ReportWriter, ScoreTensor,
};

/// Re-export inference types.
pub use imgclass_inference::{
    DeviceInfo, DeviceKind, InferenceBackend, InferenceError, RandomBackend, StaticBackend,
    TensorDescriptor, TensorLayout,
};
