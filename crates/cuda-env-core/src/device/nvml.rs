use log::{debug, warn};
use nvml_wrapper::enum_wrappers::device::Clock;
use nvml_wrapper::{Device, Nvml};

use crate::device::{DeviceDescriptor, DeviceError, DeviceHandle, DeviceQuery};

const BACKEND: &str = "nvml";

/// Device query backed by the NVIDIA Management Library.
///
/// `libnvidia-ml` is loaded at runtime, so a host without the driver still
/// builds; the failure surfaces on the first query instead.
pub struct NvmlDeviceQuery {
    nvml: Result<Nvml, String>,
}

impl NvmlDeviceQuery {
    pub fn init() -> Self {
        let nvml = Nvml::init().map_err(|e| {
            warn!("NVML initialisation failed: {}", e);
            e.to_string()
        });
        Self { nvml }
    }

    fn nvml(&self) -> Result<&Nvml, DeviceError> {
        self.nvml.as_ref().map_err(|reason| DeviceError::BackendUnavailable {
            backend: BACKEND.to_string(),
            reason: reason.clone(),
        })
    }
}

impl DeviceQuery for NvmlDeviceQuery {
    fn backend_name(&self) -> &str {
        BACKEND
    }

    fn device_count(&self) -> Result<u32, DeviceError> {
        self.nvml()?
            .device_count()
            .map_err(|e| DeviceError::Count { message: e.to_string() })
    }

    fn open_device(&self, index: u32) -> Result<Box<dyn DeviceHandle + '_>, DeviceError> {
        let device = self
            .nvml()?
            .device_by_index(index)
            .map_err(|e| DeviceError::Open {
                index,
                message: e.to_string(),
            })?;
        Ok(Box::new(NvmlDeviceHandle { index, device }))
    }
}

struct NvmlDeviceHandle<'a> {
    index: u32,
    device: Device<'a>,
}

impl DeviceHandle for NvmlDeviceHandle<'_> {
    fn describe(&self) -> Result<DeviceDescriptor, DeviceError> {
        let describe_err = |e: nvml_wrapper::error::NvmlError| DeviceError::Describe {
            index: self.index,
            message: e.to_string(),
        };
        let name = self.device.name().map_err(describe_err)?;
        let capability = self.device.cuda_compute_capability().map_err(describe_err)?;
        let memory = self.device.memory_info().map_err(describe_err)?;
        // NVML reports MHz; descriptors carry kHz like the CUDA runtime does.
        let clock_mhz = self.device.max_clock_info(Clock::Graphics).map_err(describe_err)?;

        Ok(DeviceDescriptor {
            name,
            compute_capability_major: capability.major,
            compute_capability_minor: capability.minor,
            total_global_memory_bytes: memory.total,
            clock_rate_khz: clock_mhz.saturating_mul(1000),
        })
    }
}

impl Drop for NvmlDeviceHandle<'_> {
    fn drop(&mut self) {
        debug!("Released NVML device {}", self.index);
    }
}
