use serde::Serialize;

use crate::device::{DeviceEntry, EnumerationReport};
use crate::kernel::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::library_test::{DiscoveryError, ExecutionOutcome, Phase, TestRun};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    /// Every mandatory phase passed but cleanup did not.
    CleanupFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    pub phase: Phase,
    pub passed: bool,
    pub elapsed_ms: u64,
}

/// What the run recorded for one library test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRecord {
    pub key: String,
    pub name: String,
    pub version: String,
    pub template_version: String,
    pub status: TestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup_error: Option<String>,
    pub phases: Vec<PhaseSummary>,
}

impl TestRecord {
    pub fn from_run(key: &str, run: &TestRun) -> Self {
        let status = match &run.outcome {
            ExecutionOutcome::Success => TestStatus::Passed,
            ExecutionOutcome::Failed { .. } => TestStatus::Failed,
            ExecutionOutcome::CleanupFailed(_) => TestStatus::CleanupFailed,
        };
        Self {
            key: key.to_string(),
            name: run.descriptor.name.clone(),
            version: run.descriptor.version.clone(),
            template_version: run.template_version.clone(),
            status,
            error: run.outcome.primary_error().map(ToString::to_string),
            cleanup_error: run.outcome.cleanup_error().map(ToString::to_string),
            phases: run
                .phases
                .iter()
                .map(|record| PhaseSummary {
                    phase: record.phase,
                    passed: record.passed,
                    elapsed_ms: u64::try_from(record.elapsed.as_millis()).unwrap_or(u64::MAX),
                })
                .collect(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryRecord {
    pub key: String,
    pub error: String,
}

/// Everything a harness command observed, in run order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub backend: String,
    pub device_count: u32,
    pub devices: Vec<DeviceEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enumeration_error: Option<String>,
    /// Library tests were skipped because enumeration failed.
    pub aborted: bool,
    pub tests: Vec<TestRecord>,
    pub discovery_errors: Vec<DiscoveryRecord>,
}

impl RunSummary {
    pub fn from_enumeration(report: &EnumerationReport) -> Self {
        Self {
            backend: report.backend.clone(),
            device_count: report.device_count,
            devices: report.devices.clone(),
            enumeration_error: report.error.as_ref().map(ToString::to_string),
            ..Self::default()
        }
    }

    pub fn record_test(&mut self, key: &str, run: &TestRun) {
        self.tests.push(TestRecord::from_run(key, run));
    }

    pub fn record_discovery_error(&mut self, error: &DiscoveryError) {
        self.discovery_errors.push(DiscoveryRecord {
            key: error.key().to_string(),
            error: error.to_string(),
        });
    }

    pub fn passed(&self) -> usize {
        self.tests.iter().filter(|t| t.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.tests.len() - self.passed()
    }

    /// Devices that could be described.
    pub fn reported_devices(&self) -> usize {
        self.devices.iter().filter(|d| d.is_success()).count()
    }

    pub fn is_success(&self) -> bool {
        self.enumeration_error.is_none()
            && self.devices.iter().all(DeviceEntry::is_success)
            && self.discovery_errors.is_empty()
            && self.tests.iter().all(TestRecord::is_success)
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        }
    }
}
