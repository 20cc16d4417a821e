//! Runs one image through the inference runtime.

use tracing::debug;

use imgclass_inference::{InferenceBackend, InferenceError, TensorDescriptor};

use super::context::{AcceleratorContext, DeviceBuffer};
use super::decoder::ImageTensor;

/// Per-class scores produced by one inference call.
///
/// Holds device memory; dropping it releases the buffer.
#[derive(Debug)]
pub struct ScoreTensor<'ctx> {
    buffer: DeviceBuffer<'ctx>,
}

impl ScoreTensor<'_> {
    pub fn class_count(&self) -> usize {
        self.buffer.len()
    }

    pub fn scores(&self) -> &[f32] {
        self.buffer.as_slice()
    }
}

/// Classify `input`, consuming it.
///
/// The image is staged into device memory and released as soon as the
/// backend has run. On any failure every buffer allocated here is released
/// before the error is returned.
pub fn infer<'ctx, B: InferenceBackend>(
    ctx: &'ctx AcceleratorContext<B>,
    input: ImageTensor,
    input_desc: &TensorDescriptor,
    output_desc: &TensorDescriptor,
    class_count: usize,
) -> Result<ScoreTensor<'ctx>, InferenceError> {
    if input_desc.height != input.height() as usize
        || input_desc.width != input.width() as usize
        || input_desc.layout != input.layout()
    {
        return Err(InferenceError::InvalidInput(format!(
            "descriptor {:?} does not describe a {}x{} image",
            input_desc.shape(),
            input.width(),
            input.height()
        )));
    }
    if output_desc.element_count() != class_count {
        return Err(InferenceError::InvalidInput(format!(
            "output descriptor holds {} elements, expected {} classes",
            output_desc.element_count(),
            class_count
        )));
    }

    let staged = ctx.upload(input.samples())?;
    drop(input);

    let mut output = ctx.allocate(class_count)?;
    let scores = ctx
        .runtime()
        .run(staged.as_slice(), input_desc, output_desc)?;
    drop(staged);

    if scores.len() != class_count {
        return Err(InferenceError::OutputExtraction(format!(
            "{} backend returned {} scores, expected {}",
            ctx.runtime().name(),
            scores.len(),
            class_count
        )));
    }
    output.as_mut_slice().copy_from_slice(&scores);

    debug!("Scored {} classes on {}", class_count, ctx.device().name);
    Ok(ScoreTensor { buffer: output })
}
