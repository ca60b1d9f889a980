//! Fixtures for tests of conversion runs.
//!
//! Small helpers that write input files and read output files back as plain strings, so
//! tests can compare cells without going through the pipeline under test.
//!
//! ```
//! use parquet2csv::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = std::env::temp_dir().join("parquet2csv-doc-fixture");
//! std::fs::create_dir_all(&dir)?;
//! let path = dir.join("people.csv");
//! write_text_fixture(&path, &sample_table(3), b',')?;
//! let rows = read_text_fixture(&path, b',')?;
//! assert_eq!(rows.len(), 4);
//! assert_eq!(rows[0], ["id", "name", "city"]);
//! # Ok(())
//! # }
//! ```

use crate::io::compression::CodecRegistry;
use crate::value::Value;
use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Header plus `rows` data rows of a small people table.
///
/// Cells include a delimiter, a quote and an empty value so the quoting rules get
/// exercised.
#[must_use]
pub fn sample_table(rows: usize) -> Vec<Vec<String>> {
    const CITIES: [&str; 4] = ["Lisbon", "Oslo, Norway", "", "Quote \"Q\" Town"];
    let mut out = Vec::with_capacity(rows + 1);
    out.push(vec!["id".into(), "name".into(), "city".into()]);
    for i in 0..rows {
        out.push(vec![
            i.to_string(),
            format!("person-{i}"),
            CITIES[i % CITIES.len()].to_string(),
        ]);
    }
    out
}

/// Write `rows` as delimited text. A compression suffix on `path` is honored.
///
/// # Errors
/// The file cannot be created or written.
pub fn write_text_fixture<R, C>(path: impl AsRef<Path>, rows: &[R], delimiter: u8) -> Result<()>
where
    R: AsRef<[C]>,
    C: AsRef<str>,
{
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let out = CodecRegistry::default().writer(file, path)?;
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(out);
    for (i, row) in rows.iter().enumerate() {
        wtr.write_record(row.as_ref().iter().map(|c| c.as_ref()))
            .with_context(|| format!("write fixture row #{}", i + 1))?;
    }
    let out = wtr
        .into_inner()
        .map_err(csv::IntoInnerError::into_error)
        .with_context(|| format!("flush {}", path.display()))?;
    out.finish()
        .with_context(|| format!("finish {}", path.display()))?;
    Ok(())
}

/// Read delimited text into rows of cells, header included. Compressed files are
/// detected by suffix or magic bytes.
///
/// # Errors
/// The file cannot be opened or parsed.
pub fn read_text_fixture(path: impl AsRef<Path>, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut text = String::new();
    CodecRegistry::default()
        .reader(file, path)?
        .read_to_string(&mut text)
        .with_context(|| format!("read {}", path.display()))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());
    let mut out = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("parse text row #{}", i + 1))?;
        out.push(rec.iter().map(str::to_string).collect());
    }
    Ok(out)
}

/// Write one record batch to a Parquet file.
///
/// # Errors
/// The file cannot be created or the writer rejects the batch.
pub fn write_parquet_fixture(path: impl AsRef<Path>, batch: &RecordBatch) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("create ArrowWriter")?;
    writer.write(batch).context("write batch to parquet")?;
    writer.close().context("close ArrowWriter")?;
    Ok(())
}

/// Read a Parquet file as column names plus rows of canonical cell text.
///
/// # Errors
/// The file cannot be opened or decoded.
pub fn read_parquet_strings(path: impl AsRef<Path>) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("open ParquetRecordBatchReader")?;
    let names = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("build ParquetRecordBatchReader")?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.context("read batch")?;
        for row in 0..batch.num_rows() {
            rows.push(
                batch
                    .columns()
                    .iter()
                    .map(|col| Value::from_array(col, row, false).to_text().into_owned())
                    .collect(),
            );
        }
    }
    Ok((names, rows))
}
