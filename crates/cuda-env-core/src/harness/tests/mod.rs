mod harness_tests;

use std::io;

use crate::device::{DeviceDescriptor, DeviceError, EnumerationError, EnumerationReport};
use crate::harness::RunSummary;
use crate::library_test::{DiscoveryError, TestDescriptor, TestRun};
use crate::report::{ReportSink, TestListing};

/// Sink that keeps a one-line description of every event it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<String>,
}

impl ReportSink for RecordingSink {
    fn begin(&mut self) -> io::Result<()> {
        self.events.push("begin".to_string());
        Ok(())
    }

    fn device_count(&mut self, backend: &str, count: u32) -> io::Result<()> {
        self.events.push(format!("count {} {}", backend, count));
        Ok(())
    }

    fn device(&mut self, index: u32, descriptor: &DeviceDescriptor) -> io::Result<()> {
        self.events.push(format!("device {} {}", index, descriptor.name));
        Ok(())
    }

    fn device_error(&mut self, index: u32, _error: &DeviceError) -> io::Result<()> {
        self.events.push(format!("device_error {}", index));
        Ok(())
    }

    fn enumeration_error(&mut self, _error: &EnumerationError) -> io::Result<()> {
        self.events.push("enumeration_error".to_string());
        Ok(())
    }

    fn enumeration_complete(&mut self, _report: &EnumerationReport) -> io::Result<()> {
        self.events.push("enumeration_complete".to_string());
        Ok(())
    }

    fn test_started(&mut self, key: &str, _descriptor: &TestDescriptor, _template_version: &str) -> io::Result<()> {
        self.events.push(format!("started {}", key));
        Ok(())
    }

    fn test_finished(&mut self, key: &str, run: &TestRun) -> io::Result<()> {
        let result = if run.is_success() { "passed" } else { "failed" };
        self.events.push(format!("finished {} {}", key, result));
        Ok(())
    }

    fn discovery_error(&mut self, error: &DiscoveryError) -> io::Result<()> {
        self.events.push(format!("discovery_error {}", error.key()));
        Ok(())
    }

    fn test_listing(&mut self, listing: &[TestListing]) -> io::Result<()> {
        self.events.push(format!("listing {}", listing.len()));
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> io::Result<()> {
        self.events.push(format!("finish {}", summary.exit_code()));
        Ok(())
    }
}
