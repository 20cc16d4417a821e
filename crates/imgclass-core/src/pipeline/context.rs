//! Accelerator context: device selection, runtime ownership and device memory.

use std::cell::Cell;

use tracing::{debug, info, warn};

use imgclass_inference::{DeviceInfo, InferenceBackend, InferenceError};

use crate::error::{ClassifyError, Result};
use crate::models::config::DeviceConfig;

/// Snapshot of device-memory accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Buffers allocated since the context was acquired.
    pub allocations: usize,
    /// Buffers released since the context was acquired.
    pub releases: usize,
    pub bytes_in_use: usize,
    pub peak_bytes: usize,
}

impl MemoryStats {
    /// Buffers currently alive.
    pub fn live_buffers(&self) -> usize {
        self.allocations - self.releases
    }
}

#[derive(Debug, Default)]
struct MemoryLedger {
    allocations: Cell<usize>,
    releases: Cell<usize>,
    in_use: Cell<usize>,
    peak: Cell<usize>,
    limit: Option<usize>,
}

impl MemoryLedger {
    fn reserve(&self, bytes: usize) -> std::result::Result<(), InferenceError> {
        let in_use = self.in_use.get();
        let over_limit = match self.limit {
            Some(limit) => in_use.checked_add(bytes).is_none_or(|total| total > limit),
            None => false,
        };
        if over_limit {
            return Err(InferenceError::Allocation {
                requested: bytes,
                in_use,
            });
        }

        self.in_use.set(in_use + bytes);
        self.peak.set(self.peak.get().max(in_use + bytes));
        self.allocations.set(self.allocations.get() + 1);
        Ok(())
    }

    fn unreserve(&self, bytes: usize) {
        self.in_use.set(self.in_use.get() - bytes);
        self.releases.set(self.releases.get() + 1);
    }

    fn stats(&self) -> MemoryStats {
        MemoryStats {
            allocations: self.allocations.get(),
            releases: self.releases.get(),
            bytes_in_use: self.in_use.get(),
            peak_bytes: self.peak.get(),
        }
    }
}

/// A buffer of device-visible memory.
///
/// Borrows the context it was allocated from and is released when dropped,
/// so no buffer can outlive its context and every exit path frees it.
#[derive(Debug)]
pub struct DeviceBuffer<'ctx> {
    data: Vec<f32>,
    ledger: &'ctx MemoryLedger,
}

impl DeviceBuffer<'_> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    fn size_in_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

impl Drop for DeviceBuffer<'_> {
    fn drop(&mut self) {
        self.ledger.unreserve(self.size_in_bytes());
    }
}

/// Process-scoped bundle of the selected device and the inference runtime.
///
/// One context serves a whole batch. It is not `Sync`: the pipeline is
/// strictly sequential and the memory ledger relies on that.
pub struct AcceleratorContext<B: InferenceBackend> {
    device: DeviceInfo,
    device_count: usize,
    runtime: B,
    ledger: MemoryLedger,
}

impl<B: InferenceBackend> AcceleratorContext<B> {
    /// Discover devices through `runtime`, pick one and bind the runtime to it.
    ///
    /// Fails with `DeviceUnavailable` when the backend reports no usable
    /// device or cannot initialize on the selected one.
    pub fn acquire(mut runtime: B, config: &DeviceConfig) -> Result<Self> {
        let devices = runtime.devices().map_err(|e| {
            ClassifyError::DeviceUnavailable(format!("device discovery failed: {}", e))
        })?;

        let accelerators = devices.iter().filter(|d| d.kind.is_accelerator()).count();
        info!(
            "Found {} devices ({} accelerators) via {} backend",
            devices.len(),
            accelerators,
            runtime.name()
        );

        if devices.is_empty() {
            return Err(ClassifyError::DeviceUnavailable(format!(
                "{} backend reports no devices",
                runtime.name()
            )));
        }

        let device = devices.get(config.index).cloned().ok_or_else(|| {
            ClassifyError::DeviceUnavailable(format!(
                "device index {} out of range ({} devices)",
                config.index,
                devices.len()
            ))
        })?;

        if config.require_accelerator && !device.kind.is_accelerator() {
            return Err(ClassifyError::DeviceUnavailable(format!(
                "device {} ({}) is not an accelerator",
                device.index, device.name
            )));
        }

        match device.compute_capability {
            Some((major, minor)) => info!("Compute capability: {}.{}", major, minor),
            None => info!("Compute capability: n/a ({:?} device {})", device.kind, device.name),
        }

        runtime.bind(&device).map_err(|e| {
            ClassifyError::DeviceUnavailable(format!(
                "failed to initialize {} runtime on {}: {}",
                runtime.name(),
                device.name,
                e
            ))
        })?;
        info!("Created {} runtime handle on {}", runtime.name(), device.name);

        Ok(Self {
            device,
            device_count: devices.len(),
            runtime,
            ledger: MemoryLedger {
                limit: config.memory_limit_bytes,
                ..Default::default()
            },
        })
    }

    /// The device the runtime is bound to.
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// Number of devices discovered at acquisition.
    pub fn device_count(&self) -> usize {
        self.device_count
    }

    /// The inference runtime handle.
    pub fn runtime(&self) -> &B {
        &self.runtime
    }

    pub fn stats(&self) -> MemoryStats {
        self.ledger.stats()
    }

    /// Allocate a zeroed buffer of `len` elements.
    pub fn allocate(&self, len: usize) -> std::result::Result<DeviceBuffer<'_>, InferenceError> {
        let bytes = len
            .checked_mul(std::mem::size_of::<f32>())
            .ok_or(InferenceError::Allocation {
                requested: usize::MAX,
                in_use: self.ledger.in_use.get(),
            })?;

        let mut data = Vec::new();
        if data.try_reserve_exact(len).is_err() {
            return Err(InferenceError::Allocation {
                requested: bytes,
                in_use: self.ledger.in_use.get(),
            });
        }
        self.ledger.reserve(bytes)?;
        data.resize(len, 0.0);

        debug!("Allocated {} bytes on {}", bytes, self.device.name);
        Ok(DeviceBuffer {
            data,
            ledger: &self.ledger,
        })
    }

    /// Allocate a buffer and copy `data` into it.
    pub fn upload(&self, data: &[f32]) -> std::result::Result<DeviceBuffer<'_>, InferenceError> {
        let mut buffer = self.allocate(data.len())?;
        buffer.as_mut_slice().copy_from_slice(data);
        Ok(buffer)
    }

    /// Tear down the runtime.
    ///
    /// Consumes the context, so it cannot be released twice or while a
    /// buffer allocated from it is still alive.
    pub fn release(self) -> MemoryStats {
        let stats = self.ledger.stats();
        if stats.live_buffers() != 0 || stats.bytes_in_use != 0 {
            warn!(
                "Releasing context with {} live buffers ({} bytes)",
                stats.live_buffers(),
                stats.bytes_in_use
            );
        }
        info!(
            "Destroyed {} runtime handle ({} allocations, {} releases, peak {} bytes)",
            self.runtime.name(),
            stats.allocations,
            stats.releases,
            stats.peak_bytes
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgclass_inference::{DeviceKind, StaticBackend, TensorDescriptor};
    use pretty_assertions::assert_eq;

    struct ScriptedBackend {
        devices: Vec<DeviceInfo>,
        fail_bind: bool,
    }

    impl InferenceBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn devices(&self) -> imgclass_inference::Result<Vec<DeviceInfo>> {
            Ok(self.devices.clone())
        }

        fn bind(&mut self, _device: &DeviceInfo) -> imgclass_inference::Result<()> {
            if self.fail_bind {
                return Err(InferenceError::SessionCreate("driver missing".to_string()));
            }
            Ok(())
        }

        fn run(
            &self,
            _input: &[f32],
            _input_desc: &TensorDescriptor,
            _output_desc: &TensorDescriptor,
        ) -> imgclass_inference::Result<Vec<f32>> {
            Ok(Vec::new())
        }
    }

    fn gpu(index: usize) -> DeviceInfo {
        DeviceInfo {
            index,
            kind: DeviceKind::Cuda,
            name: format!("cuda:{}", index),
            compute_capability: Some((8, 6)),
        }
    }

    #[test]
    fn test_acquire_selects_device() {
        let backend = ScriptedBackend {
            devices: vec![gpu(0), DeviceInfo::host(1)],
            fail_bind: false,
        };
        let config = DeviceConfig {
            index: 1,
            ..Default::default()
        };

        let ctx = AcceleratorContext::acquire(backend, &config).unwrap();
        assert_eq!(ctx.device_count(), 2);
        assert_eq!(ctx.device().kind, DeviceKind::Cpu);
    }

    #[test]
    fn test_no_devices_is_unavailable() {
        let backend = ScriptedBackend {
            devices: Vec::new(),
            fail_bind: false,
        };
        let result = AcceleratorContext::acquire(backend, &DeviceConfig::default());
        assert!(matches!(result, Err(ClassifyError::DeviceUnavailable(_))));
    }

    #[test]
    fn test_require_accelerator_rejects_host() {
        let config = DeviceConfig {
            require_accelerator: true,
            ..Default::default()
        };
        let result = AcceleratorContext::acquire(StaticBackend::new(vec![1.0]), &config);
        assert!(matches!(result, Err(ClassifyError::DeviceUnavailable(_))));

        let backend = ScriptedBackend {
            devices: vec![gpu(0)],
            fail_bind: false,
        };
        assert!(AcceleratorContext::acquire(backend, &config).is_ok());
    }

    #[test]
    fn test_bind_failure_is_unavailable() {
        let backend = ScriptedBackend {
            devices: vec![gpu(0)],
            fail_bind: true,
        };
        let result = AcceleratorContext::acquire(backend, &DeviceConfig::default());
        assert!(matches!(result, Err(ClassifyError::DeviceUnavailable(_))));
    }

    #[test]
    fn test_index_out_of_range() {
        let config = DeviceConfig {
            index: 3,
            ..Default::default()
        };
        let result = AcceleratorContext::acquire(StaticBackend::new(vec![1.0]), &config);
        assert!(matches!(result, Err(ClassifyError::DeviceUnavailable(_))));
    }

    #[test]
    fn test_buffers_are_released_on_drop() {
        let ctx =
            AcceleratorContext::acquire(StaticBackend::new(vec![1.0]), &DeviceConfig::default())
                .unwrap();

        {
            let a = ctx.allocate(4).unwrap();
            let b = ctx.upload(&[1.0, 2.0]).unwrap();
            assert_eq!(a.as_slice(), &[0.0; 4]);
            assert_eq!(b.as_slice(), &[1.0, 2.0]);
            assert_eq!(ctx.stats().bytes_in_use, 24);
            assert_eq!(ctx.stats().live_buffers(), 2);
        }

        let stats = ctx.release();
        assert_eq!(
            stats,
            MemoryStats {
                allocations: 2,
                releases: 2,
                bytes_in_use: 0,
                peak_bytes: 24,
            }
        );
    }

    #[test]
    fn test_memory_limit() {
        let config = DeviceConfig {
            memory_limit_bytes: Some(16),
            ..Default::default()
        };
        let ctx = AcceleratorContext::acquire(StaticBackend::new(vec![1.0]), &config).unwrap();

        let first = ctx.allocate(3).unwrap();
        let err = ctx.allocate(2).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::Allocation {
                requested: 8,
                in_use: 12
            }
        ));

        drop(first);
        assert!(ctx.allocate(4).is_ok());
        assert_eq!(ctx.stats().live_buffers(), 0);
    }
}
