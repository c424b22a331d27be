use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

pub use strata_dtype::DeviceSpec;

use crate::allocator::{Allocator, CpuAllocator};
use crate::error::{InvalidDeviceSnafu, Result};

/// Extension trait for DeviceSpec to add parsing functionality.
pub trait DeviceSpecExt {
    /// Parse a device string into a DeviceSpec.
    ///
    /// Examples:
    /// - "CPU" -> DeviceSpec::Cpu
    /// - "CUDA:1" -> DeviceSpec::Cuda { device_id: 1 }
    /// - "cuda" -> DeviceSpec::Cuda { device_id: 0 }
    fn parse(s: &str) -> Result<DeviceSpec>;
}

impl DeviceSpecExt for DeviceSpec {
    fn parse(s: &str) -> Result<Self> {
        let upper = s.to_uppercase();
        let mut parts = upper.split(':');

        match (parts.next(), parts.next(), parts.next()) {
            (Some("CPU"), None, None) => Ok(DeviceSpec::Cpu),
            (Some("CUDA" | "GPU"), id, None) => {
                let device_id = match id {
                    Some(id) => id.parse().map_err(|_| InvalidDeviceSnafu { device: s }.build())?,
                    None => 0,
                };
                Ok(DeviceSpec::Cuda { device_id })
            }
            _ => InvalidDeviceSnafu { device: s }.fail(),
        }
    }
}

/// Process-wide cache of memory backends, one per device.
pub struct DeviceRegistry {
    devices: RwLock<HashMap<DeviceSpec, Arc<dyn Allocator>>>,
}

impl DeviceRegistry {
    fn new() -> Self {
        Self { devices: RwLock::new(HashMap::new()) }
    }

    /// Get or create the backend for a device.
    pub fn get(&self, spec: &DeviceSpec) -> Result<Arc<dyn Allocator>> {
        {
            let devices = self.devices.read();
            if let Some(allocator) = devices.get(spec) {
                return Ok(Arc::clone(allocator));
            }
        }

        let mut devices = self.devices.write();
        if let Some(allocator) = devices.get(spec) {
            return Ok(Arc::clone(allocator));
        }

        let allocator = Self::create_allocator(spec)?;
        debug!(device = %spec, backend = allocator.name(), "registered memory backend");
        devices.insert(*spec, Arc::clone(&allocator));
        Ok(allocator)
    }

    /// Get a device by parsing a device string.
    pub fn get_device(&self, device: &str) -> Result<Arc<dyn Allocator>> {
        let spec = <DeviceSpec as DeviceSpecExt>::parse(device)?;
        self.get(&spec)
    }

    fn create_allocator(spec: &DeviceSpec) -> Result<Arc<dyn Allocator>> {
        match spec {
            DeviceSpec::Cpu => Ok(Arc::new(CpuAllocator)),
            DeviceSpec::Cuda { .. } => InvalidDeviceSnafu { device: spec.to_string() }.fail(),
        }
    }
}

static REGISTRY: Lazy<DeviceRegistry> = Lazy::new(DeviceRegistry::new);

/// Get the global device registry.
pub fn registry() -> &'static DeviceRegistry {
    &REGISTRY
}

/// Convenience function to get a device backend by string.
pub fn get_device(device: &str) -> Result<Arc<dyn Allocator>> {
    registry().get_device(device)
}

/// Convenience function to get the CPU backend.
pub fn cpu() -> Result<Arc<dyn Allocator>> {
    registry().get(&DeviceSpec::Cpu)
}
