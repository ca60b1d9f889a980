//! Column schema derived from the header row.
//!
//! In the text → Parquet direction there is no type inference: every column is a
//! required `BYTE_ARRAY` annotated as UTF-8 text, and names are taken verbatim from the
//! header. A schema is built exactly once per run, from the first row read.

use crate::encoder::RowEncoder;
use crate::error::ConvertError;
use crate::io::batch_reader::Record;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use parquet::basic::{LogicalType, Type as PhysicalType};
use std::collections::HashSet;
use std::sync::Arc;

/// One output column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub logical_type: LogicalType,
    pub physical_type: PhysicalType,
}

impl ColumnDescriptor {
    /// A UTF-8 text column.
    pub fn utf8(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logical_type: LogicalType::String,
            physical_type: PhysicalType::BYTE_ARRAY,
        }
    }
}

/// Immutable, ordered set of column descriptors.
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    columns: Vec<ColumnDescriptor>,
    arrow: SchemaRef,
}

impl ColumnSchema {
    fn from_columns(columns: Vec<ColumnDescriptor>) -> Self {
        let fields: Vec<Field> = columns
            .iter()
            .map(|c| Field::new(&c.name, DataType::Utf8, false))
            .collect();
        Self {
            columns,
            arrow: Arc::new(Schema::new(fields)),
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// The Arrow view handed to the Parquet writer.
    #[must_use]
    pub fn arrow_schema(&self) -> SchemaRef {
        Arc::clone(&self.arrow)
    }
}

/// Builds the run's single [`ColumnSchema`] and its [`RowEncoder`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    built: bool,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the schema from `header` and return it with an encoder for later records.
    ///
    /// # Errors
    /// - called a second time in the same run;
    /// - the header has no fields or repeats a column name.
    pub fn build(
        &mut self,
        header: &Record,
    ) -> Result<(Arc<ColumnSchema>, RowEncoder), ConvertError> {
        if self.built {
            return Err(ConvertError::invalid(
                "schema is derived once per run from the first row",
            ));
        }
        if header.is_empty() {
            return Err(ConvertError::invalid("header row has no fields"));
        }

        let mut seen = HashSet::with_capacity(header.len());
        for name in header {
            if !seen.insert(name) {
                return Err(ConvertError::invalid(format!(
                    "duplicate column name {name:?} in header"
                )));
            }
        }

        let schema = Arc::new(ColumnSchema::from_columns(
            header.iter().map(ColumnDescriptor::utf8).collect(),
        ));
        self.built = true;
        let encoder = RowEncoder::new(Arc::clone(&schema));
        Ok((schema, encoder))
    }
}
