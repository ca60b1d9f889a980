//! Error taxonomy for conversion runs.
//!
//! Every fallible function in the crate returns [`anyhow::Result`] and attaches a
//! human-readable context on the way up. The *kind* of failure is carried by a
//! [`ConvertError`] at the root of the chain, so callers (and tests) can classify a
//! failure with [`anyhow::Error::downcast_ref`]:
//!
//! ```
//! use parquet2csv::error::{ConvertError, ErrorKind};
//!
//! let err = anyhow::Error::new(ConvertError::schema_mismatch(3, 2, 1))
//!     .context("encode row");
//! let kind = err.downcast_ref::<ConvertError>().map(ConvertError::kind);
//! assert_eq!(kind, Some(ErrorKind::SchemaMismatch));
//! ```
//!
//! No error kind is retried. A run fails fast on the first error.

use std::io;
use thiserror::Error;

/// Coarse classification of a [`ConvertError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad arguments or paths. The run never starts.
    InputValidation,
    /// A record's field count differs from the header's.
    SchemaMismatch,
    /// Open/read/write/close failure on either format.
    Io,
    /// The columnar writer rejected a row or failed to flush/finalize.
    WriteFailure,
}

/// Root cause of a failed conversion run.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("line {line}: header has {expected} fields but record has {found}")]
    SchemaMismatch {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{context}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    #[error("{context}")]
    Decode {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("parquet write failed")]
    Write(#[from] parquet::errors::ParquetError),

    #[error("arrow batch rejected")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("columnar sink is {state}, cannot {operation}")]
    SinkState {
        state: &'static str,
        operation: &'static str,
    },
}

impl ConvertError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InputValidation(msg.into())
    }

    #[must_use]
    pub fn schema_mismatch(line: u64, expected: usize, found: usize) -> Self {
        Self::SchemaMismatch {
            line,
            expected,
            found,
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn csv(context: impl Into<String>, source: csv::Error) -> Self {
        // csv wraps plain io errors; keep those classified as Io.
        if source.is_io_error() {
            return Self::Io {
                context: context.into(),
                source: io::Error::from(source),
            };
        }
        Self::Csv {
            context: context.into(),
            source,
        }
    }

    /// A failure decoding Parquet input.
    pub fn decode(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Decode {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InputValidation(_) => ErrorKind::InputValidation,
            Self::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Self::Io { .. } | Self::Csv { .. } | Self::Decode { .. } => ErrorKind::Io,
            Self::Write(_) | Self::Arrow(_) | Self::SinkState { .. } => ErrorKind::WriteFailure,
        }
    }
}

/// Classify an [`anyhow::Error`] by the [`ConvertError`] somewhere in its chain.
///
/// Bare I/O errors that were never wrapped are reported as [`ErrorKind::Io`].
#[must_use]
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    if let Some(e) = err.downcast_ref::<ConvertError>() {
        return Some(e.kind());
    }
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<ConvertError>() {
            Some(e.kind())
        } else if cause.downcast_ref::<io::Error>().is_some() {
            Some(ErrorKind::Io)
        } else {
            None
        }
    })
}
