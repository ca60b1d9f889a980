//! Delimited text → batches of records, produced on a background thread.
//!
//! [`BatchReader::spawn`] moves the text source into a producer thread that parses
//! records with the `csv` crate and publishes them in [`Batch`]es of at most
//! `batch_rows` records on a bounded channel. Read or parse failures go to a second,
//! separate channel. The consumer polls both through [`BatchStream::next_batch`]:
//!
//! - before handing out each batch the error channel is checked without blocking, and
//!   a pending error is returned instead of the batch;
//! - once the batch channel closes, the error channel is checked one last time so a
//!   failure on the final read is not lost.
//!
//! At most one error is ever reported; the producer stops after sending it.
//!
//! Every record is returned as read, including the first one: the header is the
//! consumer's business, as is the field-count check.

use crate::error::ConvertError;
use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};
use csv::StringRecord;
use std::io::Read;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

/// A record is an ordered sequence of text cells.
pub type Record = StringRecord;

/// Batches that may be queued ahead of the consumer.
const CHANNEL_DEPTH: usize = 2;

/// A group of consecutive records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    /// 0-based position of this batch in the stream.
    pub index: u64,
    /// Records in source order.
    pub rows: Vec<Record>,
}

impl Batch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Text parsing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Records per batch (minimum 1).
    pub batch_rows: usize,
    /// Field delimiter byte.
    pub delimiter: u8,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_rows: crate::config::DEFAULT_BATCH_ROWS,
            delimiter: b',',
        }
    }
}

/// Owns a text source until it is spawned into a producer thread.
pub struct BatchReader<R> {
    source: R,
    options: BatchOptions,
}

impl<R: Read + Send + 'static> BatchReader<R> {
    pub fn new(source: R, options: BatchOptions) -> Self {
        Self { source, options }
    }

    /// Start the producer thread and return the consumer side.
    ///
    /// # Errors
    /// Fails only if the OS refuses to start the thread.
    pub fn spawn(self) -> anyhow::Result<BatchStream> {
        let (batch_tx, batches) = bounded::<Batch>(CHANNEL_DEPTH);
        let (error_tx, errors) = bounded::<ConvertError>(1);
        let handle = thread::Builder::new()
            .name("batch-reader".into())
            .spawn(move || produce(self.source, self.options, &batch_tx, &error_tx))
            .map_err(|e| ConvertError::io("spawn batch reader thread", e))?;
        Ok(BatchStream {
            batches,
            errors,
            handle: Some(handle),
            failed: false,
        })
    }
}

fn produce(
    source: impl Read,
    options: BatchOptions,
    batch_tx: &Sender<Batch>,
    error_tx: &Sender<ConvertError>,
) {
    let batch_rows = options.batch_rows.max(1);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(source);

    let mut index = 0u64;
    let mut rows = Vec::with_capacity(batch_rows);
    let mut record = StringRecord::new();
    loop {
        match rdr.read_record(&mut record) {
            Ok(true) => {
                rows.push(record.clone());
                if rows.len() == batch_rows {
                    let batch = Batch {
                        index,
                        rows: std::mem::replace(&mut rows, Vec::with_capacity(batch_rows)),
                    };
                    trace!(index, "batch ready");
                    if batch_tx.send(batch).is_err() {
                        // Consumer went away; nothing left to report to.
                        return;
                    }
                    index += 1;
                }
            }
            Ok(false) => break,
            Err(e) => {
                let line = e.position().map_or(0, csv::Position::line);
                // The error goes out before the batch sender drops, so the
                // consumer's final check is guaranteed to see it.
                let _ = error_tx.send(ConvertError::csv(format!("read text line {line}"), e));
                return;
            }
        }
    }
    if !rows.is_empty() {
        let _ = batch_tx.send(Batch { index, rows });
        index += 1;
    }
    debug!(batches = index, "text source exhausted");
}

/// Consumer side of a running [`BatchReader`].
pub struct BatchStream {
    batches: Receiver<Batch>,
    errors: Receiver<ConvertError>,
    handle: Option<JoinHandle<()>>,
    failed: bool,
}

impl BatchStream {
    /// Next batch, `Ok(None)` at end of input, or the producer's error.
    ///
    /// After an error has been returned the stream is finished and yields `Ok(None)`.
    ///
    /// # Errors
    /// The first read/parse failure reported by the producer.
    pub fn next_batch(&mut self) -> Result<Option<Batch>, ConvertError> {
        if self.failed {
            return Ok(None);
        }
        match self.batches.recv() {
            Ok(batch) => {
                self.check_errors()?;
                Ok(Some(batch))
            }
            Err(_) => {
                self.check_errors()?;
                self.join();
                Ok(None)
            }
        }
    }

    fn check_errors(&mut self) -> Result<(), ConvertError> {
        match self.errors.try_recv() {
            Ok(e) => {
                self.failed = true;
                Err(e)
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => Ok(()),
        }
    }

    fn join(&mut self) {
        if let Some(h) = self.handle.take()
            && h.join().is_err()
        {
            tracing::error!("batch reader thread panicked");
        }
    }
}

impl Iterator for BatchStream {
    type Item = Result<Batch, ConvertError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch().transpose()
    }
}

impl Drop for BatchStream {
    fn drop(&mut self) {
        // Unblock a producer waiting on a full channel before joining it.
        let (_, closed) = bounded::<Batch>(0);
        drop(std::mem::replace(&mut self.batches, closed));
        self.join();
    }
}
