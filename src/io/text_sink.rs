//! Delimited text output for the reverse direction.
//!
//! Records (the header included) are counted as they are written, and the writer is
//! flushed every time the count is a multiple of `flush_rows`. [`TextSink::close`] does
//! the last flush and hands back the underlying writer. A sink over a
//! [`FinishWrite`] output ends with [`TextSink::finish`] instead, which also writes the
//! compression trailer.

use crate::error::ConvertError;
use crate::io::compression::FinishWrite;
use csv::WriterBuilder;
use std::io::Write;
use tracing::trace;

/// Totals of a closed [`TextSink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextReport {
    /// Records written, header included.
    pub records: u64,
    /// Flushes triggered by the cadence.
    pub forced_flushes: u64,
}

pub struct TextSink<W: Write> {
    writer: csv::Writer<W>,
    flush_rows: u64,
    report: TextReport,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W, delimiter: u8, flush_rows: usize) -> Self {
        let writer = WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_writer(out);
        Self {
            writer,
            flush_rows: (flush_rows as u64).max(1),
            report: TextReport::default(),
        }
    }

    /// Write one record.
    ///
    /// # Errors
    /// The underlying writer failed.
    pub fn write_record<I, T>(&mut self, record: I) -> Result<(), ConvertError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let records = self.report.records;
        self.writer
            .write_record(record)
            .map_err(|e| ConvertError::csv(format!("write text record {}", records + 1), e))?;
        self.report.records += 1;
        if self.report.records % self.flush_rows == 0 {
            self.writer
                .flush()
                .map_err(|e| ConvertError::io("flush text output", e))?;
            self.report.forced_flushes += 1;
            trace!(records = self.report.records, "text output flushed");
        }
        Ok(())
    }

    #[must_use]
    pub fn report(&self) -> TextReport {
        self.report
    }

    /// Flush what is buffered and return the writer with the totals.
    ///
    /// # Errors
    /// The final flush failed.
    pub fn close(self) -> Result<(W, TextReport), ConvertError> {
        let report = self.report;
        let mut out = self
            .writer
            .into_inner()
            .map_err(|e| ConvertError::io("flush text output", e.into_error()))?;
        out.flush()
            .map_err(|e| ConvertError::io("flush text output", e))?;
        Ok((out, report))
    }
}

impl TextSink<Box<dyn FinishWrite>> {
    /// Close the sink and finish the output stream.
    ///
    /// # Errors
    /// The final flush or the stream trailer could not be written.
    pub fn finish(self) -> Result<TextReport, ConvertError> {
        let (out, report) = self.close()?;
        out.finish()
            .map_err(|e| ConvertError::io("finish text output", e))?;
        Ok(report)
    }
}
