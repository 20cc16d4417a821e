//! Error types for the imgclass-core library.

use std::path::PathBuf;

use thiserror::Error;

use imgclass_inference::InferenceError;

/// Main error type for a classification run.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// No usable device, or the inference runtime failed to initialize.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A candidate image could not be decoded.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    /// Inference failed for a candidate image.
    #[error("inference failed for {}: {source}", path.display())]
    Inference {
        path: PathBuf,
        #[source]
        source: InferenceError,
    },

    /// The report could not be written.
    #[error("failed to write report: {0}")]
    SinkWrite(#[source] std::io::Error),

    /// I/O error while listing the input directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClassifyError {
    /// Whether the error concerns a single file rather than the whole run.
    pub fn is_per_file(&self) -> bool {
        matches!(self, ClassifyError::Decode { .. } | ClassifyError::Inference { .. })
    }
}

/// Errors related to decoding a raster image.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The file could not be opened.
    #[error("cannot open file: {0}")]
    Open(#[from] std::io::Error),

    /// The file is not a raster format the decoder understands.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The pixel buffer could not be allocated.
    #[error("cannot allocate pixel buffer: {0}")]
    Allocation(String),

    /// The raster data could not be read.
    #[error("cannot read raster: {0}")]
    Read(String),
}

impl From<image::ImageError> for DecodeError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => DecodeError::UnsupportedFormat(e.to_string()),
            image::ImageError::Limits(e) => DecodeError::Allocation(e.to_string()),
            other => DecodeError::Read(other.to_string()),
        }
    }
}

/// Result type for the imgclass-core library.
pub type Result<T> = std::result::Result<T, ClassifyError>;
