//! Seeded pseudo-random scoring backend.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::InferenceError;
use crate::{DeviceInfo, InferenceBackend, Result, TensorDescriptor};

/// Backend producing uniform scores in `[0, 1)` from a seeded generator.
///
/// The sequence of outputs is fully determined by the seed, so two runs over
/// the same files produce the same report.
pub struct RandomBackend {
    seed: u64,
    rng: Mutex<StdRng>,
}

impl RandomBackend {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl InferenceBackend for RandomBackend {
    fn name(&self) -> &str {
        "random"
    }

    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(vec![DeviceInfo::host(0)])
    }

    fn bind(&mut self, device: &DeviceInfo) -> Result<()> {
        debug!("Random backend bound to {} (seed {})", device.name, self.seed);
        Ok(())
    }

    fn run(
        &self,
        input: &[f32],
        input_desc: &TensorDescriptor,
        output_desc: &TensorDescriptor,
    ) -> Result<Vec<f32>> {
        input_desc.check_len(input.len())?;

        let mut rng = self
            .rng
            .lock()
            .map_err(|e| InferenceError::InferenceFailed(format!("Failed to lock generator: {}", e)))?;

        Ok((0..output_desc.element_count())
            .map(|_| rng.random::<f32>())
            .collect())
    }
}
