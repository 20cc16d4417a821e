//! Tensor descriptors shared by the invoker and the backends.

use ndarray::{Array4, ArrayView4};
use serde::{Deserialize, Serialize};

use crate::{InferenceError, Result};

/// Supported tensor element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorType {
    Float32,
}

impl TensorType {
    /// Size of one element in bytes.
    pub fn size_of(self) -> usize {
        match self {
            TensorType::Float32 => std::mem::size_of::<f32>(),
        }
    }
}

/// Memory layout of a four-dimensional tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// Channel-interleaved: `[batch, height, width, channels]`.
    Nhwc,
    /// Channel-major: `[batch, channels, height, width]`.
    Nchw,
}

/// Shape, element type and layout of a tensor buffer.
///
/// A descriptor never owns the buffer it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorDescriptor {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
    pub layout: TensorLayout,
    pub dtype: TensorType,
}

impl TensorDescriptor {
    /// Dimensions in the order implied by the layout.
    pub fn shape(&self) -> [usize; 4] {
        match self.layout {
            TensorLayout::Nhwc => [self.batch, self.height, self.width, self.channels],
            TensorLayout::Nchw => [self.batch, self.channels, self.height, self.width],
        }
    }

    /// Number of elements in a buffer matching this descriptor.
    pub fn element_count(&self) -> usize {
        self.batch * self.channels * self.height * self.width
    }

    /// Size in bytes of a buffer matching this descriptor.
    pub fn size_in_bytes(&self) -> usize {
        self.element_count() * self.dtype.size_of()
    }

    /// Check that a buffer of `len` elements matches this descriptor.
    pub fn check_len(&self, len: usize) -> Result<()> {
        if len != self.element_count() {
            return Err(InferenceError::InvalidInput(format!(
                "buffer holds {} elements but descriptor {:?} expects {}",
                len,
                self.shape(),
                self.element_count()
            )));
        }
        Ok(())
    }
}

/// Rearrange a buffer described by `desc` into the fixed spatial size and
/// layout a model was exported with.
///
/// Spatial resampling is nearest-neighbour; channels and batch are kept.
pub fn reshape_for_model(
    data: &[f32],
    desc: &TensorDescriptor,
    layout: TensorLayout,
    height: usize,
    width: usize,
) -> Result<Array4<f32>> {
    desc.check_len(data.len())?;
    if height == 0 || width == 0 || desc.height == 0 || desc.width == 0 {
        return Err(InferenceError::InvalidInput(
            "tensor spatial dimensions must be non-zero".to_string(),
        ));
    }

    let view = ArrayView4::from_shape(desc.shape(), data)
        .map_err(|e| InferenceError::InvalidInput(e.to_string()))?;

    // Index everything as NHWC from here on
    let src = match desc.layout {
        TensorLayout::Nhwc => view,
        TensorLayout::Nchw => view.permuted_axes([0, 2, 3, 1]),
    };
    let (batch, src_height, src_width, channels) = src.dim();

    let resized = Array4::from_shape_fn((batch, height, width, channels), |(n, y, x, c)| {
        src[[n, y * src_height / height, x * src_width / width, c]]
    });

    Ok(match layout {
        TensorLayout::Nhwc => resized,
        TensorLayout::Nchw => resized
            .permuted_axes([0, 3, 1, 2])
            .as_standard_layout()
            .into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn image_desc(height: usize, width: usize) -> TensorDescriptor {
        TensorDescriptor {
            batch: 1,
            channels: 3,
            height,
            width,
            layout: TensorLayout::Nhwc,
            dtype: TensorType::Float32,
        }
    }

    #[test]
    fn test_shape_follows_layout() {
        let mut desc = image_desc(4, 5);
        assert_eq!(desc.shape(), [1, 4, 5, 3]);

        desc.layout = TensorLayout::Nchw;
        assert_eq!(desc.shape(), [1, 3, 4, 5]);
        assert_eq!(desc.element_count(), 60);
        assert_eq!(desc.size_in_bytes(), 240);
    }

    #[test]
    fn test_check_len_rejects_mismatch() {
        let desc = image_desc(2, 2);
        assert!(desc.check_len(12).is_ok());
        assert!(matches!(
            desc.check_len(11),
            Err(InferenceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_reshape_to_channel_major() {
        // Two pixels: (r0, g0, b0), (r1, g1, b1)
        let data = [0.0, 0.1, 0.2, 1.0, 1.1, 1.2];
        let desc = image_desc(1, 2);

        let out = reshape_for_model(&data, &desc, TensorLayout::Nchw, 1, 2).unwrap();
        assert_eq!(out.shape(), &[1, 3, 1, 2]);

        let flat: Vec<f32> = out.iter().copied().collect();
        assert_eq!(flat, vec![0.0, 1.0, 0.1, 1.1, 0.2, 1.2]);
    }

    #[test]
    fn test_reshape_nearest_upsample() {
        let data = [0.25, 0.5, 0.75];
        let desc = image_desc(1, 1);

        let out = reshape_for_model(&data, &desc, TensorLayout::Nhwc, 2, 2).unwrap();
        assert_eq!(out.shape(), &[1, 2, 2, 3]);
        for pixel in out.exact_chunks((1, 1, 1, 3)) {
            let values: Vec<f32> = pixel.iter().copied().collect();
            assert_eq!(values, vec![0.25, 0.5, 0.75]);
        }
    }

    #[test]
    fn test_reshape_rejects_empty_target() {
        let data = [0.0; 3];
        let desc = image_desc(1, 1);
        assert!(reshape_for_model(&data, &desc, TensorLayout::Nhwc, 0, 4).is_err());
    }
}
