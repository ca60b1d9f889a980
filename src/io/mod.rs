//! File-facing components of both conversion directions.

pub mod batch_reader;
pub mod columnar_sink;
pub mod columnar_source;
pub mod compression;
pub mod text_sink;

pub use batch_reader::{Batch, BatchOptions, BatchReader, BatchStream, Record};
pub use columnar_sink::{ColumnarSink, SinkOptions, SinkPhase, SinkReport};
pub use columnar_source::{ColumnarSource, DecodedRow, RowChunk};
pub use compression::{CodecRegistry, FinishWrite, TextCodec};
pub use text_sink::{TextReport, TextSink};
