//! # CUDA Env Core Reporting
//!
//! Write-only sinks for the human-facing output of a run.
//!
//! The harness emits events in run order (device count, each device, each
//! test, the summary) to a [`ReportSink`]. Log output goes through the `log`
//! facade instead and never reaches a sink.
//!
//! - [`plain::PlainTextReporter`]: line-oriented text, the default.
//! - [`table::TableReporter`]: aligned tables for devices and tests.
//! - [`json::JsonReporter`]: a single JSON document with the run summary.
pub mod json;
pub mod plain;
pub mod table;

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::device::{DeviceDescriptor, DeviceError, EnumerationError, EnumerationReport};
use crate::harness::RunSummary;
use crate::library_test::{DiscoveryError, TestDescriptor, TestRun};

pub use json::JsonReporter;
pub use plain::PlainTextReporter;
pub use table::TableReporter;

/// Supported report renderings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Plain,
    Table,
    Json,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Plain => write!(f, "plain"),
            ReportFormat::Table => write!(f, "table"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" | "text" => Ok(ReportFormat::Plain),
            "table" => Ok(ReportFormat::Table),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format '{}'", other)),
        }
    }
}

/// One registered library test, as shown by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestListing {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<TestDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Receiver of run events.
///
/// Every method has a no-op default so a sink only implements what it renders.
pub trait ReportSink {
    fn begin(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn device_count(&mut self, _backend: &str, _count: u32) -> io::Result<()> {
        Ok(())
    }

    fn device(&mut self, _index: u32, _descriptor: &DeviceDescriptor) -> io::Result<()> {
        Ok(())
    }

    fn device_error(&mut self, _index: u32, _error: &DeviceError) -> io::Result<()> {
        Ok(())
    }

    fn enumeration_error(&mut self, _error: &EnumerationError) -> io::Result<()> {
        Ok(())
    }

    fn enumeration_complete(&mut self, _report: &EnumerationReport) -> io::Result<()> {
        Ok(())
    }

    fn test_started(
        &mut self,
        _key: &str,
        _descriptor: &TestDescriptor,
        _template_version: &str,
    ) -> io::Result<()> {
        Ok(())
    }

    fn test_finished(&mut self, _key: &str, _run: &TestRun) -> io::Result<()> {
        Ok(())
    }

    fn discovery_error(&mut self, _error: &DiscoveryError) -> io::Result<()> {
        Ok(())
    }

    fn test_listing(&mut self, _listing: &[TestListing]) -> io::Result<()> {
        Ok(())
    }

    fn finish(&mut self, _summary: &RunSummary) -> io::Result<()> {
        Ok(())
    }
}

/// Build the sink for `format` writing to `writer`.
pub fn sink_for(format: ReportFormat, writer: Box<dyn Write>) -> Box<dyn ReportSink> {
    match format {
        ReportFormat::Plain => Box::new(PlainTextReporter::new(writer)),
        ReportFormat::Table => Box::new(TableReporter::new(writer)),
        ReportFormat::Json => Box::new(JsonReporter::new(writer)),
    }
}
