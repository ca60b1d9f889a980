//! Record → schema-conformant row.
//!
//! The encoder borrows a name → value mapping from its [`BufferPool`], fills it
//! positionally from the header, and exposes the values back in schema column order.
//! The mapping goes back to the pool when the [`EncodedRow`] is dropped, normally right
//! after the sink's `write` returns.

use crate::error::ConvertError;
use crate::io::batch_reader::Record;
use crate::pool::{BufferPool, PoolStats, Pooled};
use crate::schema::ColumnSchema;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Mapping = HashMap<String, String>;

pub struct RowEncoder {
    schema: Arc<ColumnSchema>,
    pool: BufferPool<Mapping>,
}

impl fmt::Debug for RowEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowEncoder")
            .field("columns", &self.schema.len())
            .field("pool", &self.pool.stats())
            .finish()
    }
}

impl RowEncoder {
    pub(crate) fn new(schema: Arc<ColumnSchema>) -> Self {
        let width = schema.len();
        Self {
            schema,
            pool: BufferPool::new(move || HashMap::with_capacity(width)),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    /// Encode one data record.
    ///
    /// # Errors
    /// [`ConvertError::SchemaMismatch`] when the record's field count differs from the
    /// header's. This is fatal for the run.
    pub fn encode(&self, record: &Record) -> Result<EncodedRow<'_>, ConvertError> {
        if record.len() != self.schema.len() {
            let line = record.position().map_or(0, csv::Position::line);
            return Err(ConvertError::schema_mismatch(
                line,
                self.schema.len(),
                record.len(),
            ));
        }

        let mut mapping = self.pool.acquire();
        for (name, cell) in self.schema.names().zip(record.iter()) {
            if let Some(slot) = mapping.get_mut(name) {
                slot.push_str(cell);
            } else {
                mapping.insert(name.to_string(), cell.to_string());
            }
        }
        Ok(EncodedRow {
            schema: &self.schema,
            mapping,
        })
    }

    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

/// One row ready for the columnar sink.
pub struct EncodedRow<'a> {
    schema: &'a ColumnSchema,
    mapping: Pooled<'a, Mapping>,
}

impl EncodedRow<'_> {
    /// Value of the column at schema position `i`.
    #[must_use]
    pub fn value(&self, i: usize) -> &str {
        self.schema
            .columns()
            .get(i)
            .and_then(|c| self.mapping.get(&c.name))
            .map_or("", String::as_str)
    }

    /// Value by column name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.mapping.get(name).map(String::as_str)
    }

    /// `(name, value)` pairs in schema column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        (0..self.schema.len()).map(|i| (self.schema.columns()[i].name.as_str(), self.value(i)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schema.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schema.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::SchemaBuilder;

    #[test]
    fn values_follow_schema_order() {
        let (_, enc) = SchemaBuilder::new()
            .build(&Record::from(vec!["b", "a"]))
            .unwrap();
        let row = enc.encode(&Record::from(vec!["2", "1"])).unwrap();
        assert_eq!(row.value(0), "2");
        assert_eq!(row.get("a"), Some("1"));
        assert_eq!(
            row.iter().collect::<Vec<_>>(),
            vec![("b", "2"), ("a", "1")]
        );
    }

    #[test]
    fn mapping_is_reused_without_stale_values() {
        let (_, enc) = SchemaBuilder::new()
            .build(&Record::from(vec!["k"]))
            .unwrap();
        {
            let row = enc.encode(&Record::from(vec!["long value"])).unwrap();
            assert_eq!(row.value(0), "long value");
        }
        let row = enc.encode(&Record::from(vec!["x"])).unwrap();
        assert_eq!(row.value(0), "x");
        let stats = enc.pool_stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn length_mismatch_is_fatal() {
        let (_, enc) = SchemaBuilder::new()
            .build(&Record::from(vec!["a", "b"]))
            .unwrap();
        let Err(err) = enc.encode(&Record::from(vec!["only one"])) else {
            panic!("short record accepted");
        };
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
        assert!(enc.encode(&Record::from(vec!["1", "2", "3"])).is_err());
    }

    #[test]
    fn empty_cells_are_kept() {
        let (_, enc) = SchemaBuilder::new()
            .build(&Record::from(vec!["a", "b"]))
            .unwrap();
        let row = enc.encode(&Record::from(vec!["", "z"])).unwrap();
        assert_eq!(row.value(0), "");
        assert_eq!(row.value(1), "z");
    }
}
