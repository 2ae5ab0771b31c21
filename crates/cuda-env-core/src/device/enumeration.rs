use log::{error, info, warn};
use serde::Serialize;

use crate::device::{DeviceDescriptor, DeviceError, DeviceQuery, EnumerationError};
use crate::report::ReportSink;

/// What was learnt about a single device index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceEntry {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<DeviceDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeviceEntry {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of the enumeration phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationReport {
    pub backend: String,
    pub device_count: u32,
    pub devices: Vec<DeviceEntry>,
    /// Set when the device count could not be queried.
    pub error: Option<EnumerationError>,
}

impl EnumerationReport {
    /// No enumeration error and every device could be described.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.devices.iter().all(DeviceEntry::is_success)
    }

    pub fn failed_devices(&self) -> usize {
        self.devices.iter().filter(|d| !d.is_success()).count()
    }
}

/// Query, describe and report every device.
///
/// Each device is opened, described and released before the next index is
/// touched. A failure on one device is reported and enumeration moves on;
/// only a failing device count stops the phase. The returned `Err` is
/// reserved for failures writing to the sink.
pub fn enumerate_devices(
    query: &dyn DeviceQuery,
    sink: &mut dyn ReportSink,
) -> std::io::Result<EnumerationReport> {
    let backend = query.backend_name().to_string();
    info!("Enumerating devices via {}", backend);

    let device_count = match query.device_count() {
        Ok(count) => count,
        Err(source) => {
            let err = EnumerationError {
                backend: backend.clone(),
                source,
            };
            error!("{}", err);
            sink.enumeration_error(&err)?;
            return Ok(EnumerationReport {
                backend,
                device_count: 0,
                devices: Vec::new(),
                error: Some(err),
            });
        }
    };
    sink.device_count(&backend, device_count)?;

    let mut devices = Vec::with_capacity(device_count as usize);
    for index in 0..device_count {
        let entry = match describe_device(query, index) {
            Ok(descriptor) => {
                sink.device(index, &descriptor)?;
                DeviceEntry {
                    index,
                    descriptor: Some(descriptor),
                    error: None,
                }
            }
            Err(err) => {
                warn!("{}", err);
                sink.device_error(index, &err)?;
                DeviceEntry {
                    index,
                    descriptor: None,
                    error: Some(err.to_string()),
                }
            }
        };
        devices.push(entry);
    }

    let report = EnumerationReport {
        backend,
        device_count,
        devices,
        error: None,
    };
    sink.enumeration_complete(&report)?;
    Ok(report)
}

fn describe_device(query: &dyn DeviceQuery, index: u32) -> Result<DeviceDescriptor, DeviceError> {
    let handle = query.open_device(index)?;
    // The handle drops at the end of this scope on both paths.
    handle.describe()
}
