//! Run configuration.
//!
//! A [`ConvertConfig`] is built once at process start (by the CLI, or directly by a
//! library user) and passed by reference into the pipeline entry points in
//! [`crate::convert`]. There is no process-wide mutable state.

use crate::error::ConvertError;
use parquet::basic::{BrotliLevel, Compression, GzipLevel, ZstdLevel};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default rows between forced flushes (and rows per Parquet read chunk).
pub const DEFAULT_FLUSH_ROWS: usize = 10_000;

/// Default rows per text batch handed from the reader thread to the encoder.
pub const DEFAULT_BATCH_ROWS: usize = 10_000;

/// Row-group size threshold of the Parquet writer, in bytes.
pub const ROW_GROUP_BYTES: usize = 128 * 1024 * 1024;

/// Parquet compression codec, numbered like the format's `CompressionCodec` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParquetCodec {
    #[default]
    Uncompressed,
    Snappy,
    Gzip,
    Lzo,
    Brotli,
    Lz4,
    Zstd,
    Lz4Raw,
}

impl ParquetCodec {
    /// Map the format's numeric codec id (0 = uncompressed, 1 = snappy, ...).
    ///
    /// # Errors
    /// Returns [`ConvertError::InputValidation`] for ids outside `0..=7`.
    pub fn from_id(id: i32) -> Result<Self, ConvertError> {
        Ok(match id {
            0 => Self::Uncompressed,
            1 => Self::Snappy,
            2 => Self::Gzip,
            3 => Self::Lzo,
            4 => Self::Brotli,
            5 => Self::Lz4,
            6 => Self::Zstd,
            7 => Self::Lz4Raw,
            other => {
                return Err(ConvertError::invalid(format!(
                    "unknown compression codec id {other} (expected 0..=7)"
                )));
            }
        })
    }

    #[must_use]
    pub const fn id(self) -> i32 {
        self as i32
    }

    /// Writer-side codec for the `parquet` crate.
    ///
    /// # Errors
    /// LZO has no encoder in the `parquet` crate and is rejected.
    pub fn to_parquet(self) -> Result<Compression, ConvertError> {
        Ok(match self {
            Self::Uncompressed => Compression::UNCOMPRESSED,
            Self::Snappy => Compression::SNAPPY,
            Self::Gzip => Compression::GZIP(GzipLevel::default()),
            Self::Lzo => {
                return Err(ConvertError::invalid(
                    "LZO compression (codec 3) is not supported for writing",
                ));
            }
            Self::Brotli => Compression::BROTLI(BrotliLevel::default()),
            Self::Lz4 => Compression::LZ4,
            Self::Zstd => Compression::ZSTD(ZstdLevel::default()),
            Self::Lz4Raw => Compression::LZ4_RAW,
        })
    }
}

/// Parameters of one conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub compression: ParquetCodec,
    /// Rows between forced flushes; also the Parquet read chunk size.
    pub flush_rows: usize,
    /// Rows per batch on the text reader channel.
    pub batch_rows: usize,
    /// Field delimiter. Only a single-byte character can be used.
    pub delimiter: char,
    /// Print runtime statistics at the end of the run.
    pub verbose: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            compression: ParquetCodec::Uncompressed,
            flush_rows: DEFAULT_FLUSH_ROWS,
            batch_rows: DEFAULT_BATCH_ROWS,
            delimiter: ',',
            verbose: false,
        }
    }
}

impl ConvertConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_compression(mut self, codec: ParquetCodec) -> Self {
        self.compression = codec;
        self
    }

    #[must_use]
    pub fn with_flush_rows(mut self, rows: usize) -> Self {
        self.flush_rows = rows;
        self
    }

    #[must_use]
    pub fn with_batch_rows(mut self, rows: usize) -> Self {
        self.batch_rows = rows;
        self
    }

    /// Use the first character of `delimiter`; the rest is ignored.
    #[must_use]
    pub fn with_delimiter_str(mut self, delimiter: &str) -> Self {
        if let Some(c) = delimiter.chars().next() {
            self.delimiter = c;
        }
        self
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn verbose(mut self, on: bool) -> Self {
        self.verbose = on;
        self
    }

    /// The delimiter as the single byte the text codec works with.
    ///
    /// # Errors
    /// Non-ASCII delimiters are rejected.
    pub fn delimiter_byte(&self) -> Result<u8, ConvertError> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                ConvertError::invalid(format!(
                    "delimiter {:?} is not a single-byte character",
                    self.delimiter
                ))
            })
    }

    /// Check the numeric knobs before a run starts.
    ///
    /// # Errors
    /// Zero flush or batch sizes, or a non-ASCII delimiter.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.flush_rows == 0 {
            return Err(ConvertError::invalid("flush must be at least 1 row"));
        }
        if self.batch_rows == 0 {
            return Err(ConvertError::invalid("batch size must be at least 1 row"));
        }
        self.delimiter_byte()?;
        Ok(())
    }
}
