use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::debug;

use crate::device::{DeviceDescriptor, DeviceError, DeviceHandle, DeviceQuery};

/// Call counters shared between a mock query and the handles it hands out.
#[derive(Debug, Default)]
pub struct MockStats {
    count_calls: AtomicUsize,
    opened: AtomicUsize,
    released: AtomicUsize,
    describe_calls: AtomicUsize,
}

impl MockStats {
    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }
}

/// Device query backed by a fixed list of descriptors.
#[derive(Debug, Default)]
pub struct MockDeviceQuery {
    devices: Vec<DeviceDescriptor>,
    count_failure: Option<String>,
    open_failures: HashSet<u32>,
    describe_failures: HashSet<u32>,
    stats: Arc<MockStats>,
}

impl MockDeviceQuery {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            devices,
            ..Self::default()
        }
    }

    /// Two representative devices, used when no mock devices are configured.
    pub fn builtin() -> Self {
        Self::new(vec![
            DeviceDescriptor {
                name: "Mock RTX 4090".to_string(),
                compute_capability_major: 8,
                compute_capability_minor: 9,
                total_global_memory_bytes: 24_564 * 1024 * 1024,
                clock_rate_khz: 2_520_000,
            },
            DeviceDescriptor {
                name: "Mock A100".to_string(),
                compute_capability_major: 8,
                compute_capability_minor: 0,
                total_global_memory_bytes: 40_960 * 1024 * 1024,
                clock_rate_khz: 1_410_000,
            },
        ])
    }

    /// Make `device_count` fail with `message`.
    pub fn failing_count(mut self, message: &str) -> Self {
        self.count_failure = Some(message.to_string());
        self
    }

    /// Make `open_device(index)` fail.
    pub fn failing_open(mut self, index: u32) -> Self {
        self.open_failures.insert(index);
        self
    }

    /// Make `describe` fail for the device at `index`.
    pub fn failing_describe(mut self, index: u32) -> Self {
        self.describe_failures.insert(index);
        self
    }

    pub fn stats(&self) -> Arc<MockStats> {
        self.stats.clone()
    }
}

impl DeviceQuery for MockDeviceQuery {
    fn backend_name(&self) -> &str {
        "mock"
    }

    fn device_count(&self) -> Result<u32, DeviceError> {
        self.stats.count_calls.fetch_add(1, Ordering::SeqCst);
        match &self.count_failure {
            Some(message) => Err(DeviceError::Count {
                message: message.clone(),
            }),
            None => Ok(self.devices.len() as u32),
        }
    }

    fn open_device(&self, index: u32) -> Result<Box<dyn DeviceHandle + '_>, DeviceError> {
        if self.open_failures.contains(&index) {
            return Err(DeviceError::Open {
                index,
                message: "simulated open failure".to_string(),
            });
        }
        let descriptor = self
            .devices
            .get(index as usize)
            .ok_or_else(|| DeviceError::Open {
                index,
                message: format!("no mock device at index {}", index),
            })?;
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockDeviceHandle {
            index,
            descriptor,
            fail_describe: self.describe_failures.contains(&index),
            stats: self.stats.clone(),
        }))
    }
}

struct MockDeviceHandle<'a> {
    index: u32,
    descriptor: &'a DeviceDescriptor,
    fail_describe: bool,
    stats: Arc<MockStats>,
}

impl DeviceHandle for MockDeviceHandle<'_> {
    fn describe(&self) -> Result<DeviceDescriptor, DeviceError> {
        self.stats.describe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_describe {
            return Err(DeviceError::Describe {
                index: self.index,
                message: "simulated describe failure".to_string(),
            });
        }
        Ok(self.descriptor.clone())
    }
}

impl Drop for MockDeviceHandle<'_> {
    fn drop(&mut self) {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        debug!("Released mock device {}", self.index);
    }
}
