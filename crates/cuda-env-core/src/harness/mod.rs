//! # CUDA Env Core Harness
//!
//! The driver behind every command. [`Harness::run`] enumerates devices, then
//! walks the registry's candidates in order, running each test through the
//! lifecycle in isolation. Nothing a single device, candidate or test does
//! stops the others; the [`RunSummary`] collects what happened.
pub mod summary;

use log::{info, warn};

use crate::config::HarnessConfig;
use crate::device::{enumerate_devices, DeviceQuery};
use crate::kernel::error::Result;
use crate::library_test::{run_test, DiscoveredTest, LifecycleOptions, TestDescriptor, TestRegistry};
use crate::report::{ReportSink, TestListing};

pub use summary::{DiscoveryRecord, PhaseSummary, RunSummary, TestRecord, TestStatus};

pub struct Harness {
    query: Box<dyn DeviceQuery>,
    registry: TestRegistry,
    options: LifecycleOptions,
    continue_on_enumeration_failure: bool,
}

impl Harness {
    pub fn new(query: Box<dyn DeviceQuery>, registry: TestRegistry) -> Self {
        Self {
            query,
            registry,
            options: LifecycleOptions::default(),
            continue_on_enumeration_failure: false,
        }
    }

    /// Build a harness with the lifecycle and enumeration settings of `config`.
    pub fn from_config(
        config: &HarnessConfig,
        query: Box<dyn DeviceQuery>,
        registry: TestRegistry,
    ) -> Self {
        Self::new(query, registry)
            .with_options(config.lifecycle_options())
            .continue_on_enumeration_failure(config.continue_on_enumeration_failure)
    }

    pub fn with_options(mut self, options: LifecycleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn continue_on_enumeration_failure(mut self, enabled: bool) -> Self {
        self.continue_on_enumeration_failure = enabled;
        self
    }

    /// Enumerate devices, then run every registered library test.
    ///
    /// Test failures are recorded in the summary, never returned. `Err` means
    /// the report sink could not be written.
    pub async fn run(&self, sink: &mut dyn ReportSink) -> Result<RunSummary> {
        sink.begin()?;
        let report = enumerate_devices(self.query.as_ref(), sink)?;
        let mut summary = RunSummary::from_enumeration(&report);

        if report.error.is_some() && !self.continue_on_enumeration_failure {
            warn!("Skipping library tests after enumeration failure");
            summary.aborted = true;
            sink.finish(&summary)?;
            return Ok(summary);
        }

        info!("Running {} registered library test(s)", self.registry.len());
        for candidate in self.registry.candidates() {
            let DiscoveredTest { key, mut test } = match candidate.instantiate() {
                Ok(discovered) => discovered,
                Err(err) => {
                    sink.discovery_error(&err)?;
                    summary.record_discovery_error(&err);
                    continue;
                }
            };

            let descriptor = TestDescriptor::of(test.as_ref());
            sink.test_started(&key, &descriptor, test.template_version())?;
            let run = run_test(test.as_mut(), &self.options).await;
            // The instance is never reused.
            drop(test);

            sink.test_finished(&key, &run)?;
            summary.record_test(&key, &run);
        }

        info!(
            "Run finished: {} passed, {} failed, {} skipped",
            summary.passed(),
            summary.failed(),
            summary.discovery_errors.len()
        );
        sink.finish(&summary)?;
        Ok(summary)
    }

    /// Enumeration only.
    pub fn devices(&self, sink: &mut dyn ReportSink) -> Result<RunSummary> {
        sink.begin()?;
        let report = enumerate_devices(self.query.as_ref(), sink)?;
        let summary = RunSummary::from_enumeration(&report);
        sink.finish(&summary)?;
        Ok(summary)
    }

    /// Registered tests in execution order with their library name and version.
    ///
    /// Each candidate is instantiated once to read its descriptor and dropped
    /// without running any phase.
    pub fn list(&self, sink: &mut dyn ReportSink) -> Result<Vec<TestListing>> {
        let listing: Vec<TestListing> = self
            .registry
            .candidates()
            .iter()
            .map(|candidate| match candidate.instantiate() {
                Ok(discovered) => TestListing {
                    key: discovered.key.clone(),
                    descriptor: Some(discovered.descriptor()),
                    error: None,
                },
                Err(err) => TestListing {
                    key: candidate.key().to_string(),
                    descriptor: None,
                    error: Some(err.to_string()),
                },
            })
            .collect();
        sink.test_listing(&listing)?;
        Ok(listing)
    }
}

// Test module declaration
#[cfg(test)]
mod tests;
