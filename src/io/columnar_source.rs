//! Parquet input for the reverse direction.
//!
//! [`ColumnarSource::open`] reads the footer, takes the total row count, and flattens the
//! schema to its flat top-level columns. Struct, list, map and union columns are dropped
//! from the projection, so they are never decoded. Rows are then pulled in chunks of at
//! most `chunk_rows` via [`ColumnarSource::next_chunk`].

use crate::error::ConvertError;
use crate::value::Value;
use arrow::array::ArrayRef;
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use std::fs::File;
use tracing::{debug, warn};

fn is_nested(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Struct(_)
            | DataType::List(_)
            | DataType::LargeList(_)
            | DataType::ListView(_)
            | DataType::LargeListView(_)
            | DataType::FixedSizeList(_, _)
            | DataType::Map(_, _)
            | DataType::Union(_, _)
    )
}

/// Chunked reader over the flat columns of one Parquet file.
pub struct ColumnarSource {
    reader: ParquetRecordBatchReader,
    header: Vec<String>,
    nullable: Vec<bool>,
    skipped: Vec<String>,
    num_rows: u64,
    rows_read: u64,
}

impl ColumnarSource {
    /// Open `file` and prepare a reader yielding at most `chunk_rows` rows per chunk.
    ///
    /// # Errors
    /// [`ConvertError::Decode`] when the footer cannot be read or the file is not Parquet.
    pub fn open(file: File, chunk_rows: usize) -> Result<Self, ConvertError> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| ConvertError::decode("read parquet footer", e))?;
        let num_rows = u64::try_from(builder.metadata().file_metadata().num_rows()).unwrap_or(0);

        let arrow: SchemaRef = builder.schema().clone();
        let mut roots = Vec::with_capacity(arrow.fields().len());
        let mut header = Vec::with_capacity(arrow.fields().len());
        let mut nullable = Vec::with_capacity(arrow.fields().len());
        let mut skipped = Vec::new();
        for (i, field) in arrow.fields().iter().enumerate() {
            if is_nested(field.data_type()) {
                skipped.push(field.name().clone());
                continue;
            }
            roots.push(i);
            header.push(field.name().to_lowercase());
            nullable.push(field.is_nullable());
        }
        if !skipped.is_empty() {
            warn!(columns = ?skipped, "nested columns are not converted");
        }

        let mask = ProjectionMask::roots(builder.parquet_schema(), roots);
        let reader = builder
            .with_projection(mask)
            .with_batch_size(chunk_rows.max(1))
            .build()
            .map_err(|e| ConvertError::decode("build parquet reader", e))?;
        debug!(num_rows, columns = header.len(), "columnar source opened");

        Ok(Self {
            reader,
            header,
            nullable,
            skipped,
            num_rows,
            rows_read: 0,
        })
    }

    /// Total rows recorded in the footer.
    #[must_use]
    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    /// Lower-cased names of the retained columns, in schema order.
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Original names of the nested columns that were dropped.
    #[must_use]
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    #[must_use]
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Next chunk of rows, or `None` when every row has been read.
    ///
    /// # Errors
    /// A page or column chunk failed to decode.
    pub fn next_chunk(&mut self) -> Result<Option<RowChunk>, ConvertError> {
        if self.rows_read >= self.num_rows {
            return Ok(None);
        }
        let rows_read = self.rows_read;
        let Some(batch) = self
            .reader
            .next()
            .transpose()
            .map_err(|e| ConvertError::decode(format!("decode rows after {rows_read}"), e))?
        else {
            return Ok(None);
        };
        self.rows_read += batch.num_rows() as u64;
        Ok(Some(RowChunk {
            columns: batch.columns().to_vec(),
            nullable: self.nullable.clone(),
            batch,
        }))
    }
}

/// Up to `chunk_rows` decoded rows.
#[derive(Debug)]
pub struct RowChunk {
    batch: RecordBatch,
    columns: Vec<ArrayRef>,
    nullable: Vec<bool>,
}

impl RowChunk {
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Row `row` of this chunk.
    ///
    /// # Panics
    /// If `row >= self.num_rows()`.
    #[must_use]
    pub fn row(&self, row: usize) -> DecodedRow<'_> {
        assert!(row < self.num_rows(), "row {row} out of range");
        DecodedRow { chunk: self, row }
    }

    pub fn rows(&self) -> impl Iterator<Item = DecodedRow<'_>> {
        (0..self.num_rows()).map(|row| DecodedRow { chunk: self, row })
    }
}

/// Column name → typed value view over one row of a [`RowChunk`].
#[derive(Debug, Clone, Copy)]
pub struct DecodedRow<'a> {
    chunk: &'a RowChunk,
    row: usize,
}

impl<'a> DecodedRow<'a> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunk.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunk.columns.is_empty()
    }

    /// Value of the retained column at position `i`.
    ///
    /// # Panics
    /// If `i >= self.len()`.
    #[must_use]
    pub fn value(&self, i: usize) -> Value<'a> {
        Value::from_array(&self.chunk.columns[i], self.row, self.chunk.nullable[i])
    }

    /// Value by original (not lower-cased) column name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value<'a>> {
        let i = self.chunk.batch.schema_ref().index_of(name).ok()?;
        Some(self.value(i))
    }

    /// Values in schema column order.
    pub fn values(&self) -> impl Iterator<Item = Value<'a>> + '_ {
        (0..self.len()).map(|i| self.value(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray, StructArray};
    use arrow::datatypes::{Field, Fields, Schema};
    use parquet::arrow::ArrowWriter;
    use std::sync::Arc;

    fn write(batch: &RecordBatch, path: &std::path::Path) {
        let file = File::create(path).unwrap();
        let mut w = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        w.write(batch).unwrap();
        w.close().unwrap();
    }

    #[test]
    fn reads_in_chunks_with_lowercased_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.parquet");
        let schema = Arc::new(Schema::new(vec![
            Field::new("ID", DataType::Int64, false),
            Field::new("Name", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from((0..5).collect::<Vec<i64>>())),
                Arc::new(StringArray::from(vec![Some("a"), None, Some("c"), Some("d"), Some("e")])),
            ],
        )
        .unwrap();
        write(&batch, &path);

        let mut src = ColumnarSource::open(File::open(&path).unwrap(), 2).unwrap();
        assert_eq!(src.num_rows(), 5);
        assert_eq!(src.header(), ["id", "name"]);

        let mut sizes = Vec::new();
        let mut cells = Vec::new();
        while let Some(chunk) = src.next_chunk().unwrap() {
            sizes.push(chunk.num_rows());
            for row in chunk.rows() {
                cells.push(row.values().map(|v| v.to_text().into_owned()).collect::<Vec<_>>());
            }
        }
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(cells[1], vec!["1".to_string(), String::new()]);
        assert_eq!(src.rows_read(), 5);
    }

    #[test]
    #[should_panic]
    fn value_past_last_column_panics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.parquet");
        let schema = Arc::new(Schema::new(vec![Field::new("a", DataType::Int64, false)]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![1]))]).unwrap();
        write(&batch, &path);

        let mut src = ColumnarSource::open(File::open(&path).unwrap(), 8).unwrap();
        let chunk = src.next_chunk().unwrap().unwrap();
        let row = chunk.row(0);
        assert_eq!(row.len(), 1);
        let _ = row.value(1);
    }

    #[test]
    fn nested_columns_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested.parquet");
        let inner = Fields::from(vec![Field::new("x", DataType::Int64, false)]);
        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Utf8, false),
            Field::new("s", DataType::Struct(inner.clone()), false),
            Field::new("b", DataType::Int64, false),
        ]));
        let s = StructArray::new(inner, vec![Arc::new(Int64Array::from(vec![9]))], None);
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["v"])),
                Arc::new(s),
                Arc::new(Int64Array::from(vec![7])),
            ],
        )
        .unwrap();
        write(&batch, &path);

        let mut src = ColumnarSource::open(File::open(&path).unwrap(), 10).unwrap();
        assert_eq!(src.header(), ["a", "b"]);
        assert_eq!(src.skipped(), ["s"]);
        let chunk = src.next_chunk().unwrap().unwrap();
        let row = chunk.row(0);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("b").map(|v| v.to_text().into_owned()), Some("7".into()));
        assert!(src.next_chunk().unwrap().is_none());
    }
}
