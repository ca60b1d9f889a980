//! # parquet2csv
//!
//! Streaming conversion between delimited text files and Apache Parquet, without holding
//! a whole file in memory.
//!
//! ## Text → Parquet
//!
//! A [`BatchReader`](io::BatchReader) parses the text on a background thread and hands
//! batches of records over a bounded channel, with read errors on a second channel. The
//! first record becomes the [`ColumnSchema`](schema::ColumnSchema) (every column is
//! UTF-8 text), a [`RowEncoder`](encoder::RowEncoder) turns each later record into a
//! row using pooled scratch buffers, and a [`ColumnarSink`](io::ColumnarSink) writes row
//! groups, flushing every `flush_rows` rows.
//!
//! ## Parquet → text
//!
//! A [`ColumnarSource`](io::ColumnarSource) reads the flat top-level columns in chunks,
//! each cell is rendered by [`Value::to_text`](value::Value::to_text), and a
//! [`TextSink`](io::TextSink) writes a lower-cased header and the rows.
//!
//! ## Quick start
//!
//! ```no_run
//! use parquet2csv::config::{ConvertConfig, ParquetCodec};
//! use parquet2csv::convert::{Direction, run};
//! use parquet2csv::io::CodecRegistry;
//!
//! # fn main() -> anyhow::Result<()> {
//! let codecs = CodecRegistry::default();
//! let config = ConvertConfig::new("events.csv.gz", "events.parquet")
//!     .with_compression(ParquetCodec::Zstd)
//!     .with_flush_rows(50_000);
//! let report = run(Direction::TextToParquet, &config, &codecs)?;
//! println!("{} rows", report.rows_written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! - `compression-gzip`, `compression-zstd`, `compression-bzip2`, `compression-xz`:
//!   transparent compression of the text side by file extension.
//! - `metrics`: [`RunStatistics`](metrics::RunStatistics) attached to every run report.

pub mod config;
pub mod convert;
pub mod encoder;
pub mod error;
pub mod io;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod paths;
pub mod pool;
pub mod schema;
pub mod testing;
pub mod value;

pub use config::{ConvertConfig, ParquetCodec};
pub use convert::{Direction, RunReport, csv_to_parquet, parquet_to_csv, run};
pub use error::{ConvertError, ErrorKind, error_kind};
pub use value::Value;
