//! Tensor descriptors for the classification input and output.

use tracing::trace;

use imgclass_inference::{InferenceBackend, TensorDescriptor, TensorLayout, TensorType};

use super::context::AcceleratorContext;
use super::decoder::ImageTensor;

/// Descriptor for one channel-interleaved RGB image of `height` x `width`.
pub fn describe_input<B: InferenceBackend>(
    ctx: &AcceleratorContext<B>,
    height: usize,
    width: usize,
) -> TensorDescriptor {
    let desc = TensorDescriptor {
        batch: 1,
        channels: ImageTensor::CHANNELS,
        height,
        width,
        layout: TensorLayout::Nhwc,
        dtype: TensorType::Float32,
    };
    trace!("Input descriptor {:?} on {}", desc.shape(), ctx.device().name);
    desc
}

/// Descriptor for a `1 x class_count x 1 x 1` score tensor.
pub fn describe_output<B: InferenceBackend>(
    ctx: &AcceleratorContext<B>,
    class_count: usize,
) -> TensorDescriptor {
    let desc = TensorDescriptor {
        batch: 1,
        channels: class_count,
        height: 1,
        width: 1,
        layout: TensorLayout::Nchw,
        dtype: TensorType::Float32,
    };
    trace!("Output descriptor {:?} on {}", desc.shape(), ctx.device().name);
    desc
}
