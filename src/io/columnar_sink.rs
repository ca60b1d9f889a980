//! Parquet output with flush cadence and compression control.
//!
//! The sink is a small state machine:
//!
//! ```text
//! Uninitialized --begin(schema)--> Writing --(cadence reached)--> Flushing --> Writing
//!                                     \--stop()--> Stopped
//! ```
//!
//! Encoded rows are appended to one Arrow `StringBuilder` per column and handed to
//! [`ArrowWriter`] in chunks, so memory stays bounded by the chunk size plus the
//! writer's in-progress row group. Every `flush_rows` rows the in-progress row group
//! is closed and written out; independently, a row group that grows past
//! [`ROW_GROUP_BYTES`](crate::config::ROW_GROUP_BYTES) is closed early. `stop` writes
//! whatever is left plus the footer.
//!
//! Row-group size and codec are fixed when the schema arrives and never change.

use crate::config::{ParquetCodec, ROW_GROUP_BYTES};
use crate::encoder::EncodedRow;
use crate::error::ConvertError;
use crate::schema::ColumnSchema;
use arrow::array::{ArrayRef, StringBuilder};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, trace};

/// Rows buffered in the column builders before they are handed to the encoder.
const CHUNK_ROWS: usize = 8 * 1024;

/// Observable lifecycle phase of a [`ColumnarSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkPhase {
    Uninitialized,
    Writing,
    Flushing,
    Stopped,
}

impl SinkPhase {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Writing => "writing",
            Self::Flushing => "flushing",
            Self::Stopped => "stopped",
        }
    }
}

/// Writer knobs, fixed for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkOptions {
    pub compression: ParquetCodec,
    /// Rows between forced flushes (minimum 1).
    pub flush_rows: usize,
    /// In-progress row group size that triggers a new row group.
    pub row_group_bytes: usize,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            compression: ParquetCodec::Uncompressed,
            flush_rows: crate::config::DEFAULT_FLUSH_ROWS,
            row_group_bytes: ROW_GROUP_BYTES,
        }
    }
}

/// What a finished sink did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    pub rows_written: u64,
    /// Flushes triggered by the row cadence.
    pub forced_flushes: u64,
    /// Row groups closed early because they reached the byte limit.
    pub size_rollovers: u64,
    /// Flush performed by `stop` (always 1 for a stopped sink).
    pub final_flushes: u64,
}

struct Active<W: Write + Send> {
    writer: ArrowWriter<W>,
    schema: Arc<ColumnSchema>,
    builders: Vec<StringBuilder>,
    pending: usize,
}

enum State<W: Write + Send> {
    Uninitialized(W),
    Writing(Box<Active<W>>),
    Stopped(Option<W>),
}

/// Parquet writer owning its output for the whole run.
pub struct ColumnarSink<W: Write + Send> {
    state: State<W>,
    phase: SinkPhase,
    options: SinkOptions,
    counter: usize,
    report: SinkReport,
}

impl<W: Write + Send> ColumnarSink<W> {
    pub fn new(out: W, options: SinkOptions) -> Self {
        Self {
            state: State::Uninitialized(out),
            phase: SinkPhase::Uninitialized,
            options: SinkOptions {
                flush_rows: options.flush_rows.max(1),
                ..options
            },
            counter: 0,
            report: SinkReport::default(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> SinkPhase {
        self.phase
    }

    /// Running totals so far.
    #[must_use]
    pub fn report(&self) -> SinkReport {
        self.report
    }

    fn wrong_state(&self, operation: &'static str) -> ConvertError {
        ConvertError::SinkState {
            state: self.phase.as_str(),
            operation,
        }
    }

    /// Receive the run's schema and open the Parquet writer.
    ///
    /// # Errors
    /// Called twice, or the codec/writer cannot be set up.
    pub fn begin(&mut self, schema: Arc<ColumnSchema>) -> Result<(), ConvertError> {
        if !matches!(self.state, State::Uninitialized(_)) {
            return Err(self.wrong_state("begin"));
        }
        let compression = self.options.compression.to_parquet()?;
        let State::Uninitialized(out) = std::mem::replace(&mut self.state, State::Stopped(None))
        else {
            unreachable!("checked above");
        };
        self.phase = SinkPhase::Stopped;

        let props = writer_properties(compression);
        let writer = ArrowWriter::try_new(out, schema.arrow_schema(), Some(props))?;
        let builders = (0..schema.len())
            .map(|_| StringBuilder::with_capacity(CHUNK_ROWS, CHUNK_ROWS * 16))
            .collect();

        debug!(
            columns = schema.len(),
            codec = ?self.options.compression,
            flush_rows = self.options.flush_rows,
            row_group_bytes = self.options.row_group_bytes,
            "columnar sink writing"
        );
        self.state = State::Writing(Box::new(Active {
            writer,
            schema,
            builders,
            pending: 0,
        }));
        self.phase = SinkPhase::Writing;
        Ok(())
    }

    /// Append one row.
    ///
    /// # Errors
    /// Not in `Writing`, or the writer failed while flushing.
    pub fn write(&mut self, row: &EncodedRow<'_>) -> Result<(), ConvertError> {
        let State::Writing(active) = &mut self.state else {
            return Err(self.wrong_state("write"));
        };
        if row.len() != active.builders.len() {
            return Err(ConvertError::schema_mismatch(
                self.report.rows_written + 1,
                active.builders.len(),
                row.len(),
            ));
        }
        for (i, b) in active.builders.iter_mut().enumerate() {
            b.append_value(row.value(i));
        }
        active.pending += 1;
        self.counter += 1;
        self.report.rows_written += 1;

        if self.counter == self.options.flush_rows {
            self.flush()?;
        } else if active.pending >= CHUNK_ROWS {
            self.report.size_rollovers += drain(active, self.options.row_group_bytes)?;
        }
        Ok(())
    }

    /// Close the in-progress row group and reset the cadence counter.
    fn flush(&mut self) -> Result<(), ConvertError> {
        let State::Writing(active) = &mut self.state else {
            return Err(self.wrong_state("flush"));
        };
        self.phase = SinkPhase::Flushing;
        self.report.size_rollovers += drain(active, self.options.row_group_bytes)?;
        active.writer.flush()?;
        self.report.forced_flushes += 1;
        self.counter = 0;
        trace!(rows = self.report.rows_written, "forced flush");
        self.phase = SinkPhase::Writing;
        Ok(())
    }

    /// Write remaining rows and the footer.
    ///
    /// # Errors
    /// Not in `Writing`, or finalizing the file failed.
    pub fn stop(&mut self) -> Result<SinkReport, ConvertError> {
        if !matches!(self.state, State::Writing(_)) {
            return Err(self.wrong_state("stop"));
        }
        let State::Writing(mut active) = std::mem::replace(&mut self.state, State::Stopped(None))
        else {
            unreachable!("checked above");
        };
        self.phase = SinkPhase::Stopped;

        self.report.size_rollovers += drain(&mut active, self.options.row_group_bytes)?;
        let mut out = active.writer.into_inner()?;
        out.flush()
            .map_err(|e| ConvertError::io("flush parquet output", e))?;
        self.report.final_flushes = 1;
        self.state = State::Stopped(Some(out));

        debug!(
            rows = self.report.rows_written,
            forced_flushes = self.report.forced_flushes,
            "columnar sink stopped"
        );
        Ok(self.report)
    }

    /// The underlying output, once stopped.
    pub fn into_inner(self) -> Option<W> {
        match self.state {
            State::Stopped(out) => out,
            _ => None,
        }
    }
}

/// Row groups end only at a forced flush or at the byte limit checked in [`drain`], so
/// the writer's own row-count cap is lifted.
fn writer_properties(compression: Compression) -> WriterProperties {
    WriterProperties::builder()
        .set_compression(compression)
        .set_max_row_group_row_count(None)
        .build()
}

/// Hand buffered rows to the encoder. Returns 1 when the row group hit the byte limit
/// and was closed.
fn drain<W: Write + Send>(
    active: &mut Active<W>,
    row_group_bytes: usize,
) -> Result<u64, ConvertError> {
    if active.pending == 0 {
        return Ok(0);
    }
    let arrays: Vec<ArrayRef> = active
        .builders
        .iter_mut()
        .map(|b| Arc::new(b.finish()) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(active.schema.arrow_schema(), arrays)?;
    active.writer.write(&batch)?;
    active.pending = 0;

    if active.writer.in_progress_size() >= row_group_bytes {
        active.writer.flush()?;
        trace!("row group reached size limit");
        return Ok(1);
    }
    Ok(0)
}
