use std::io::{self, Write};

use crate::device::{DeviceDescriptor, DeviceError, EnumerationError, EnumerationReport};
use crate::harness::RunSummary;
use crate::library_test::{DiscoveryError, ExecutionOutcome, TestDescriptor, TestRun};
use crate::report::{ReportSink, TestListing};

/// Line-oriented text report.
pub struct PlainTextReporter<W: Write> {
    out: W,
}

impl<W: Write> PlainTextReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for PlainTextReporter<W> {
    fn begin(&mut self) -> io::Result<()> {
        writeln!(self.out, "CUDA Environment Test")
    }

    fn device_count(&mut self, _backend: &str, count: u32) -> io::Result<()> {
        writeln!(self.out, "Number of CUDA devices: {}", count)
    }

    fn device(&mut self, index: u32, descriptor: &DeviceDescriptor) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "Device {}: {}", index, descriptor.name)?;
        writeln!(self.out, "Compute Capability: {}", descriptor.compute_capability())?;
        writeln!(self.out, "Total Memory: {} MB", descriptor.total_memory_mb())?;
        writeln!(self.out, "Clock Rate: {} MHz", descriptor.clock_rate_mhz())
    }

    fn device_error(&mut self, index: u32, error: &DeviceError) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "Device {}: error: {}", index, error)
    }

    fn enumeration_error(&mut self, error: &EnumerationError) -> io::Result<()> {
        writeln!(self.out, "Error during CUDA test: {}", error)
    }

    fn enumeration_complete(&mut self, report: &EnumerationReport) -> io::Result<()> {
        writeln!(self.out)?;
        if report.is_success() {
            writeln!(self.out, "CUDA environment test completed successfully!")
        } else {
            writeln!(
                self.out,
                "CUDA environment test completed with {} device error(s).",
                report.failed_devices()
            )
        }
    }

    fn test_started(
        &mut self,
        key: &str,
        descriptor: &TestDescriptor,
        template_version: &str,
    ) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "Running {} ({})", descriptor, key)?;
        writeln!(self.out, "Using template version: {}", template_version)
    }

    fn test_finished(&mut self, _key: &str, run: &TestRun) -> io::Result<()> {
        match &run.outcome {
            ExecutionOutcome::Success => {
                writeln!(self.out, "{}: PASSED", run.descriptor.name)
            }
            ExecutionOutcome::Failed { primary, cleanup } => {
                writeln!(self.out, "Test failed: {}", primary)?;
                if let Some(cleanup) = cleanup {
                    writeln!(self.out, "Cleanup failed: {}", cleanup)?;
                }
                writeln!(self.out, "{}: FAILED", run.descriptor.name)
            }
            ExecutionOutcome::CleanupFailed(cleanup) => {
                writeln!(self.out, "Cleanup failed: {}", cleanup)?;
                writeln!(self.out, "{}: FAILED", run.descriptor.name)
            }
        }
    }

    fn discovery_error(&mut self, error: &DiscoveryError) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "Skipping {}: {}", error.key(), error)
    }

    fn test_listing(&mut self, listing: &[TestListing]) -> io::Result<()> {
        writeln!(self.out, "Registered library tests:")?;
        if listing.is_empty() {
            return writeln!(self.out, "  No library tests registered.");
        }
        for entry in listing {
            match (&entry.descriptor, &entry.error) {
                (Some(descriptor), _) => writeln!(self.out, "  - {}: {}", entry.key, descriptor)?,
                (None, Some(error)) => writeln!(self.out, "  - {}: unavailable ({})", entry.key, error)?,
                (None, None) => writeln!(self.out, "  - {}", entry.key)?,
            }
        }
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> io::Result<()> {
        writeln!(self.out)?;
        if summary.aborted {
            writeln!(self.out, "Run aborted after enumeration failure; library tests were not run.")?;
        }
        writeln!(
            self.out,
            "Summary: {} passed, {} failed, {} skipped; {} of {} device(s) reported",
            summary.passed(),
            summary.failed(),
            summary.discovery_errors.len(),
            summary.reported_devices(),
            summary.device_count
        )?;
        writeln!(
            self.out,
            "Result: {}",
            if summary.is_success() { "SUCCESS" } else { "FAILURE" }
        )?;
        self.out.flush()
    }
}
