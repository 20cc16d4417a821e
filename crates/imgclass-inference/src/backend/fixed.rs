//! Backend returning a fixed score vector.

use tracing::trace;

use crate::error::InferenceError;
use crate::{DeviceInfo, InferenceBackend, Result, TensorDescriptor};

/// Backend that answers every request with the same scores.
///
/// Useful for dry runs of a batch and for reproducible reports.
#[derive(Debug, Clone)]
pub struct StaticBackend {
    scores: Vec<f32>,
}

impl StaticBackend {
    pub fn new(scores: Vec<f32>) -> Self {
        Self { scores }
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }
}

impl InferenceBackend for StaticBackend {
    fn name(&self) -> &str {
        "static"
    }

    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(vec![DeviceInfo::host(0)])
    }

    fn run(
        &self,
        input: &[f32],
        input_desc: &TensorDescriptor,
        output_desc: &TensorDescriptor,
    ) -> Result<Vec<f32>> {
        input_desc.check_len(input.len())?;

        if output_desc.element_count() != self.scores.len() {
            return Err(InferenceError::OutputExtraction(format!(
                "backend holds {} scores but {} were requested",
                self.scores.len(),
                output_desc.element_count()
            )));
        }

        trace!("Returning {} fixed scores", self.scores.len());
        Ok(self.scores.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TensorLayout, TensorType};

    fn desc(channels: usize, height: usize, width: usize, layout: TensorLayout) -> TensorDescriptor {
        TensorDescriptor {
            batch: 1,
            channels,
            height,
            width,
            layout,
            dtype: TensorType::Float32,
        }
    }

    #[test]
    fn test_returns_scores() {
        let backend = StaticBackend::new(vec![0.1, 0.9, 0.2]);
        let scores = backend
            .run(
                &[1.0; 12],
                &desc(3, 2, 2, TensorLayout::Nhwc),
                &desc(3, 1, 1, TensorLayout::Nchw),
            )
            .unwrap();
        assert_eq!(scores, vec![0.1, 0.9, 0.2]);
    }

    #[test]
    fn test_class_count_mismatch() {
        let backend = StaticBackend::new(vec![0.5, 0.5]);
        let result = backend.run(
            &[0.0; 3],
            &desc(3, 1, 1, TensorLayout::Nhwc),
            &desc(4, 1, 1, TensorLayout::Nchw),
        );
        assert!(matches!(result, Err(InferenceError::OutputExtraction(_))));
    }
}
