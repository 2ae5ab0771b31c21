use std::io::{self, Write};

use crate::device::{DeviceDescriptor, DeviceError, EnumerationError, EnumerationReport};
use crate::harness::RunSummary;
use crate::library_test::{DiscoveryError, ExecutionOutcome, TestRun};
use crate::report::{ReportSink, TestListing};

const DEVICE_HEADERS: [&str; 6] = ["Index", "Name", "CC", "Memory (MB)", "Clock (MHz)", "Status"];
const TEST_HEADERS: [&str; 4] = ["Test", "Library", "Result", "Detail"];

/// Renders devices and tests as aligned tables.
///
/// Rows are buffered and written when their section completes, so column
/// widths fit the widest cell.
pub struct TableReporter<W: Write> {
    out: W,
    backend: String,
    device_rows: Vec<Vec<String>>,
    test_rows: Vec<Vec<String>>,
}

impl<W: Write> TableReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            backend: String::new(),
            device_rows: Vec::new(),
            test_rows: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Format `rows` under `headers`, padding every column to its widest cell.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let separator = format!(
        "+{}+",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );

    let mut table = String::new();
    table.push_str(&separator);
    table.push('\n');
    table.push_str(&render_row(headers.iter().copied(), &widths));
    table.push('\n');
    table.push_str(&separator);
    table.push('\n');
    for row in rows {
        table.push_str(&render_row(row.iter().map(String::as_str), &widths));
        table.push('\n');
    }
    table.push_str(&separator);
    table.push('\n');
    table
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    format!("| {} |", padded.join(" | "))
}

impl<W: Write> ReportSink for TableReporter<W> {
    fn device_count(&mut self, backend: &str, _count: u32) -> io::Result<()> {
        self.backend = backend.to_string();
        Ok(())
    }

    fn device(&mut self, index: u32, descriptor: &DeviceDescriptor) -> io::Result<()> {
        self.device_rows.push(vec![
            index.to_string(),
            descriptor.name.clone(),
            descriptor.compute_capability(),
            descriptor.total_memory_mb().to_string(),
            descriptor.clock_rate_mhz().to_string(),
            "ok".to_string(),
        ]);
        Ok(())
    }

    fn device_error(&mut self, index: u32, error: &DeviceError) -> io::Result<()> {
        self.device_rows.push(vec![
            index.to_string(),
            "-".to_string(),
            "-".to_string(),
            "-".to_string(),
            "-".to_string(),
            error.to_string(),
        ]);
        Ok(())
    }

    fn enumeration_error(&mut self, error: &EnumerationError) -> io::Result<()> {
        writeln!(self.out, "Devices: unavailable ({})", error)
    }

    fn enumeration_complete(&mut self, report: &EnumerationReport) -> io::Result<()> {
        writeln!(
            self.out,
            "Devices ({}): {} found",
            self.backend, report.device_count
        )?;
        if !self.device_rows.is_empty() {
            write!(self.out, "{}", render_table(&DEVICE_HEADERS, &self.device_rows))?;
        }
        self.device_rows.clear();
        Ok(())
    }

    fn test_finished(&mut self, key: &str, run: &TestRun) -> io::Result<()> {
        let (result, detail) = match &run.outcome {
            ExecutionOutcome::Success => ("PASSED", String::new()),
            ExecutionOutcome::Failed { primary, cleanup } => {
                let detail = match cleanup {
                    Some(cleanup) => format!("{}; cleanup: {}", primary, cleanup),
                    None => primary.to_string(),
                };
                ("FAILED", detail)
            }
            ExecutionOutcome::CleanupFailed(cleanup) => ("FAILED", format!("cleanup: {}", cleanup)),
        };
        self.test_rows.push(vec![
            key.to_string(),
            run.descriptor.to_string(),
            result.to_string(),
            detail,
        ]);
        Ok(())
    }

    fn discovery_error(&mut self, error: &DiscoveryError) -> io::Result<()> {
        self.test_rows.push(vec![
            error.key().to_string(),
            "-".to_string(),
            "SKIPPED".to_string(),
            error.to_string(),
        ]);
        Ok(())
    }

    fn test_listing(&mut self, listing: &[TestListing]) -> io::Result<()> {
        let rows: Vec<Vec<String>> = listing
            .iter()
            .map(|entry| {
                vec![
                    entry.key.clone(),
                    entry
                        .descriptor
                        .as_ref()
                        .map(|d| d.name.clone())
                        .unwrap_or_else(|| "-".to_string()),
                    entry
                        .descriptor
                        .as_ref()
                        .map(|d| d.version.clone())
                        .unwrap_or_else(|| "-".to_string()),
                    entry.error.clone().unwrap_or_default(),
                ]
            })
            .collect();
        write!(
            self.out,
            "{}",
            render_table(&["Test", "Library", "Version", "Error"], &rows)
        )?;
        self.out.flush()
    }

    fn finish(&mut self, summary: &RunSummary) -> io::Result<()> {
        if !self.test_rows.is_empty() {
            writeln!(self.out)?;
            write!(self.out, "{}", render_table(&TEST_HEADERS, &self.test_rows))?;
            self.test_rows.clear();
        }
        if summary.aborted {
            writeln!(self.out, "Library tests were not run.")?;
        }
        writeln!(
            self.out,
            "Result: {} ({} passed, {} failed, {} skipped)",
            if summary.is_success() { "SUCCESS" } else { "FAILURE" },
            summary.passed(),
            summary.failed(),
            summary.discovery_errors.len()
        )?;
        self.out.flush()
    }
}
