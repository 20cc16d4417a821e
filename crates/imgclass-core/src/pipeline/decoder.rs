//! Raster decoding into normalized RGB tensors.

use std::path::Path;

use image::{DynamicImage, ImageDecoder, ImageReader, Limits, RgbImage};
use tracing::debug;

use imgclass_inference::TensorLayout;

use crate::error::DecodeError;

/// A decoded image as channel-interleaved, row-major RGB samples in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    width: u32,
    height: u32,
    samples: Vec<f32>,
}

impl ImageTensor {
    /// Channels per pixel. Alpha is never kept.
    pub const CHANNELS: usize = 3;

    /// Normalize an 8-bit RGB raster.
    pub fn from_rgb(image: &RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            samples: image.as_raw().iter().map(|&v| normalize(v)).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> TensorLayout {
        TensorLayout::Nhwc
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

fn reserve_failed(sample_count: usize, width: u32, height: u32) -> DecodeError {
    DecodeError::Allocation(format!(
        "{} bytes for {}x{} samples",
        sample_count.saturating_mul(std::mem::size_of::<f32>()),
        width,
        height
    ))
}

fn normalize(value: u8) -> f32 {
    f32::from(value) / 255.0
}

/// Decoder turning image files into [`ImageTensor`]s.
#[derive(Debug, Clone, Default)]
pub struct RasterDecoder {
    max_image_bytes: Option<u64>,
}

impl RasterDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the allocations the underlying format decoder may make.
    pub fn with_max_image_bytes(mut self, max: Option<u64>) -> Self {
        self.max_image_bytes = max;
        self
    }

    /// Decode the image at `path`.
    ///
    /// The format is guessed from the file contents, falling back to the
    /// extension. Any alpha channel is dropped.
    pub fn decode(&self, path: &Path) -> Result<ImageTensor, DecodeError> {
        let mut reader = ImageReader::open(path)?.with_guessed_format()?;
        if reader.format().is_none() {
            return Err(DecodeError::UnsupportedFormat(format!(
                "cannot determine format of {}",
                path.display()
            )));
        }

        if let Some(max) = self.max_image_bytes {
            let mut limits = Limits::default();
            limits.max_alloc = Some(max);
            reader.limits(limits);
        }

        let decoder = reader.into_decoder()?;
        let (width, height) = decoder.dimensions();
        debug!("Decoding {} ({}x{})", path.display(), width, height);

        let sample_count = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(ImageTensor::CHANNELS))
            .ok_or_else(|| {
                DecodeError::Allocation(format!("{}x{} image is too large", width, height))
            })?;

        let mut samples = Vec::new();
        samples
            .try_reserve_exact(sample_count)
            .map_err(|_| reserve_failed(sample_count, width, height))?;

        // The format decoder's own buffer is dropped at the end of this scope
        let raster = DynamicImage::from_decoder(decoder)?.into_rgb8();
        samples.extend(raster.as_raw().iter().map(|&v| normalize(v)));

        if samples.len() != sample_count {
            return Err(DecodeError::Read(format!(
                "expected {} samples, decoded {}",
                sample_count,
                samples.len()
            )));
        }

        Ok(ImageTensor {
            width,
            height,
            samples,
        })
    }
}
