use std::io::{self, Write};

use serde::Serialize;

use crate::harness::RunSummary;
use crate::report::{ReportSink, TestListing};

/// Writes one pretty-printed JSON document per command.
///
/// Intermediate events are ignored; the document is the serialized
/// [`RunSummary`] (or the test listing for `list`).
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_document<T: Serialize + ?Sized>(&mut self, value: &T) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut self.out, value)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

impl<W: Write> ReportSink for JsonReporter<W> {
    fn test_listing(&mut self, listing: &[TestListing]) -> io::Result<()> {
        self.write_document(listing)
    }

    fn finish(&mut self, summary: &RunSummary) -> io::Result<()> {
        self.write_document(summary)
    }
}
