//! Pipeline entry points.
//!
//! - [`csv_to_parquet`]: `BatchReader` → `SchemaBuilder`/`RowEncoder` → `ColumnarSink`
//! - [`parquet_to_csv`]: `ColumnarSource` → `Value::to_text` → `TextSink`
//!
//! Both take the run's [`ConvertConfig`] and the [`CodecRegistry`] for text compression
//! as plain parameters, fail fast on the first error, and return a [`RunReport`].
//! A failed run may leave a partial output file behind; it must not be used.

use crate::config::{ConvertConfig, ROW_GROUP_BYTES};
use crate::encoder::RowEncoder;
use crate::error::ConvertError;
use crate::io::batch_reader::{BatchOptions, BatchReader};
use crate::io::columnar_sink::{ColumnarSink, SinkOptions};
use crate::io::columnar_source::ColumnarSource;
use crate::io::compression::CodecRegistry;
use crate::io::text_sink::TextSink;
#[cfg(feature = "metrics")]
use crate::metrics::RunStatistics;
use crate::paths::{self, PARQUET_EXT, TEXT_EXT};
use crate::pool::BufferPool;
use crate::schema::SchemaBuilder;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::time::Instant;
use tracing::{debug, info};

/// Which way a run converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    TextToParquet,
    ParquetToText,
}

impl Direction {
    /// CLI subcommand name: the format being produced.
    #[must_use]
    pub const fn command(self) -> &'static str {
        match self {
            Self::TextToParquet => "parquet",
            Self::ParquetToText => "csv",
        }
    }

    #[must_use]
    pub const fn source_ext(self) -> &'static str {
        match self {
            Self::TextToParquet => TEXT_EXT,
            Self::ParquetToText => PARQUET_EXT,
        }
    }

    #[must_use]
    pub const fn target_ext(self) -> &'static str {
        match self {
            Self::TextToParquet => PARQUET_EXT,
            Self::ParquetToText => TEXT_EXT,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub direction: Direction,
    /// Text batches or Parquet chunks consumed.
    pub batches: u64,
    /// Data rows read (header excluded).
    pub rows_read: u64,
    /// Data rows written (header excluded).
    pub rows_written: u64,
    pub forced_flushes: u64,
    pub final_flushes: u64,
    /// Output column names.
    pub columns: Vec<String>,
    /// Nested Parquet columns that were dropped.
    pub skipped_columns: Vec<String>,
    #[cfg(feature = "metrics")]
    pub statistics: RunStatistics,
}

impl RunReport {
    fn new(direction: Direction, config: &ConvertConfig) -> Self {
        #[cfg(not(feature = "metrics"))]
        let _ = config;
        Self {
            direction,
            batches: 0,
            rows_read: 0,
            rows_written: 0,
            forced_flushes: 0,
            final_flushes: 0,
            columns: Vec::new(),
            skipped_columns: Vec::new(),
            #[cfg(feature = "metrics")]
            statistics: RunStatistics::start(&config.input, direction.command()),
        }
    }

    #[cfg(feature = "metrics")]
    fn finish(mut self) -> Self {
        let s = &mut self.statistics;
        s.batches = self.batches;
        s.rows_read = self.rows_read;
        s.rows_written = self.rows_written;
        s.forced_flushes = self.forced_flushes;
        s.final_flushes = self.final_flushes;
        s.skipped_columns.clone_from(&self.skipped_columns);
        s.finish();
        self
    }

    #[cfg(not(feature = "metrics"))]
    fn finish(self) -> Self {
        self
    }
}

/// Check paths for a run in `direction`: source extension and existence, writable
/// destination directory.
///
/// # Errors
/// [`ConvertError::InputValidation`] describing the first failed check.
pub fn validate_paths(
    direction: Direction,
    config: &ConvertConfig,
    codecs: &CodecRegistry,
) -> Result<(), ConvertError> {
    paths::validate_input(&config.input, direction.source_ext(), codecs)?;
    paths::validate_output_dir(&config.output)
}

/// Validate paths and run the conversion in `direction`.
///
/// # Errors
/// Any validation, read, encode or write failure.
pub fn run(
    direction: Direction,
    config: &ConvertConfig,
    codecs: &CodecRegistry,
) -> Result<RunReport> {
    validate_paths(direction, config, codecs).context("validate paths")?;
    match direction {
        Direction::TextToParquet => csv_to_parquet(config, codecs),
        Direction::ParquetToText => parquet_to_csv(config, codecs),
    }
}

/// Convert delimited text at `config.input` to Parquet at `config.output`.
///
/// The first record is the header and becomes the schema; every column is UTF-8 text.
/// Text inputs with a compression suffix known to `codecs` are decompressed on the fly.
///
/// # Errors
/// - invalid configuration, empty input (no header), or a bad header;
/// - a record whose field count differs from the header's;
/// - any read, encode or write failure.
pub fn csv_to_parquet(config: &ConvertConfig, codecs: &CodecRegistry) -> Result<RunReport> {
    config.validate()?;
    let started = Instant::now();
    let mut report = RunReport::new(Direction::TextToParquet, config);

    let input = &config.input;
    let file = File::open(input).with_context(|| format!("open {}", input.display()))?;
    let source = codecs.reader(file, input)?;
    let options = BatchOptions {
        batch_rows: config.batch_rows,
        delimiter: config.delimiter_byte()?,
    };
    let mut batches = BatchReader::new(source, options).spawn()?;

    let output = &config.output;
    let out = File::create(output).with_context(|| format!("create {}", output.display()))?;
    let mut sink = ColumnarSink::new(
        out,
        SinkOptions {
            compression: config.compression,
            flush_rows: config.flush_rows,
            row_group_bytes: ROW_GROUP_BYTES,
        },
    );

    let mut builder = SchemaBuilder::new();
    let mut encoder: Option<RowEncoder> = None;
    while let Some(batch) = batches
        .next_batch()
        .with_context(|| format!("read {}", input.display()))?
    {
        report.batches += 1;
        debug!(index = batch.index, rows = batch.len(), "batch received");
        for record in &batch.rows {
            let Some(enc) = &encoder else {
                let (schema, enc) = builder.build(record).context("derive schema from header")?;
                report.columns = schema.names().map(str::to_string).collect();
                sink.begin(schema).context("start parquet writer")?;
                encoder = Some(enc);
                continue;
            };
            report.rows_read += 1;
            let row = enc
                .encode(record)
                .with_context(|| format!("encode record in batch {}", batch.index))?;
            sink.write(&row)
                .with_context(|| format!("write row {}", report.rows_read))?;
        }
    }

    if encoder.is_none() {
        return Err(ConvertError::invalid(format!(
            "{} has no header row",
            input.display()
        ))
        .into());
    }
    let written = sink.stop().context("finalize parquet output")?;
    report.rows_written = written.rows_written;
    report.forced_flushes = written.forced_flushes;
    report.final_flushes = written.final_flushes;

    info!(
        input = %input.display(),
        output = %output.display(),
        rows = report.rows_written,
        batches = report.batches,
        flushes = report.forced_flushes,
        elapsed_ms = started.elapsed().as_millis(),
        "text converted to parquet"
    );
    Ok(report.finish())
}

/// Convert Parquet at `config.input` to delimited text at `config.output`.
///
/// Only flat top-level columns are written; header names are lower-cased. A file with
/// zero rows produces an empty output without a header line.
///
/// # Errors
/// Invalid configuration, an unreadable Parquet file, or any write failure.
pub fn parquet_to_csv(config: &ConvertConfig, codecs: &CodecRegistry) -> Result<RunReport> {
    config.validate()?;
    let started = Instant::now();
    let mut report = RunReport::new(Direction::ParquetToText, config);

    let input = &config.input;
    let output = &config.output;
    let file = File::open(input).with_context(|| format!("open {}", input.display()))?;
    let mut source = ColumnarSource::open(file, config.flush_rows)
        .with_context(|| format!("read parquet footer of {}", input.display()))?;
    report.columns = source.header().to_vec();
    report.skipped_columns = source.skipped().to_vec();

    if source.num_rows() == 0 {
        File::create(output).with_context(|| format!("create {}", output.display()))?;
        info!(input = %input.display(), output = %output.display(), "parquet file has no rows");
        return Ok(report.finish());
    }

    let out = File::create(output).with_context(|| format!("create {}", output.display()))?;
    let out = codecs.writer(out, output)?;
    let mut sink = TextSink::new(out, config.delimiter_byte()?, config.flush_rows);
    sink.write_record(source.header()).context("write header")?;

    let records: BufferPool<Vec<String>> = BufferPool::new(Vec::new);
    while let Some(chunk) = source
        .next_chunk()
        .with_context(|| format!("read {}", input.display()))?
    {
        report.batches += 1;
        debug!(rows = chunk.num_rows(), "chunk decoded");
        for row in chunk.rows() {
            let mut record = records.acquire();
            record.extend(row.values().map(|v| v.to_text().into_owned()));
            sink.write_record(record.iter())?;
            report.rows_read += 1;
        }
    }

    let text = sink
        .finish()
        .with_context(|| format!("finalize {}", output.display()))?;
    report.rows_written = text.records.saturating_sub(1);
    report.forced_flushes = text.forced_flushes;
    report.final_flushes = 1;

    info!(
        input = %input.display(),
        output = %output.display(),
        rows = report.rows_written,
        chunks = report.batches,
        elapsed_ms = started.elapsed().as_millis(),
        "parquet converted to text"
    );
    Ok(report.finish())
}
