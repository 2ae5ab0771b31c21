//! # CUDA Env Core Device Query
//!
//! Thin layer over the GPU driver used by the enumeration phase.
//!
//! A [`DeviceQuery`] reports how many devices exist and opens a scoped
//! [`DeviceHandle`] per index; the handle reads the static
//! [`DeviceDescriptor`] and releases the device when dropped.
//!
//! Backends:
//! - [`nvml::NvmlDeviceQuery`] (feature `nvml`) talks to the NVIDIA driver.
//! - [`mock::MockDeviceQuery`] serves descriptors from configuration and can
//!   simulate failures.
pub mod enumeration;
pub mod mock;
#[cfg(feature = "nvml")]
pub mod nvml;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use enumeration::{enumerate_devices, DeviceEntry, EnumerationReport};
pub use mock::MockDeviceQuery;

/// Static attributes of a compute device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub name: String,
    pub compute_capability_major: i32,
    pub compute_capability_minor: i32,
    pub total_global_memory_bytes: u64,
    pub clock_rate_khz: u32,
}

impl DeviceDescriptor {
    /// "major.minor", e.g. "8.9"
    pub fn compute_capability(&self) -> String {
        format!("{}.{}", self.compute_capability_major, self.compute_capability_minor)
    }

    /// Total memory in whole mebibytes.
    pub fn total_memory_mb(&self) -> u64 {
        self.total_global_memory_bytes / (1024 * 1024)
    }

    /// Clock rate in whole megahertz.
    pub fn clock_rate_mhz(&self) -> u32 {
        self.clock_rate_khz / 1000
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Device backend '{backend}' is unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    #[error("Failed to query device count: {message}")]
    Count { message: String },

    #[error("Failed to open device {index}: {message}")]
    Open { index: u32, message: String },

    #[error("Failed to describe device {index}: {message}")]
    Describe { index: u32, message: String },
}

/// The device-count query failed, so no device could be reported.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Could not enumerate devices via '{backend}': {source}")]
pub struct EnumerationError {
    pub backend: String,
    #[source]
    pub source: DeviceError,
}

/// Source of device information
pub trait DeviceQuery {
    /// Short backend name used in reports, e.g. "nvml"
    fn backend_name(&self) -> &str;

    /// Number of devices visible to the backend.
    fn device_count(&self) -> Result<u32, DeviceError>;

    /// Acquire a handle to the device at `index`. The device is released when
    /// the handle is dropped.
    fn open_device(&self, index: u32) -> Result<Box<dyn DeviceHandle + '_>, DeviceError>;
}

/// Exclusive, scoped access to one device.
pub trait DeviceHandle {
    fn describe(&self) -> Result<DeviceDescriptor, DeviceError>;
}

// Test module declaration
#[cfg(test)]
mod tests;
