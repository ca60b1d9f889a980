//! Typed cell values and their canonical text form.
//!
//! [`Value`] is the closed set of value kinds the reverse path decodes from Parquet.
//! [`Value::to_text`] renders one value with a fixed precedence:
//!
//! | kind | text |
//! |------|------|
//! | null | empty |
//! | string | verbatim |
//! | signed / unsigned integer | base 10 |
//! | byte blob | bytes as text (invalid UTF-8 replaced) |
//! | `f32` / `f64` | shortest round-trippable decimal |
//! | boolean | `true` / `false` |
//! | timestamp | RFC 3339, UTC, `Z` suffix |
//! | optional | unwrap and recurse, empty when absent |
//! | other | generic rendering |

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float16Type, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type,
    TimeUnit, TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use arrow::util::display::array_value_to_string;
use chrono::{DateTime, SecondsFormat, Utc};
use std::borrow::Cow;

/// One decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Str(&'a str),
    Int(i64),
    UInt(u64),
    Bytes(&'a [u8]),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    /// A value from a nullable column.
    Optional(Option<Box<Value<'a>>>),
    /// Anything else, already rendered.
    Other(String),
}

impl<'a> Value<'a> {
    /// Canonical text of this value.
    #[must_use]
    pub fn to_text(&self) -> Cow<'a, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Str(s) => Cow::Borrowed(*s),
            Value::Int(i) => Cow::Owned(i.to_string()),
            Value::UInt(u) => Cow::Owned(u.to_string()),
            Value::Bytes(b) => String::from_utf8_lossy(*b),
            Value::Float32(f) => Cow::Owned(f.to_string()),
            Value::Float64(f) => Cow::Owned(f.to_string()),
            Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Value::Timestamp(ts) => {
                Cow::Owned(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Optional(None) => Cow::Borrowed(""),
            Value::Optional(Some(inner)) => inner.to_text(),
            Value::Other(s) => Cow::Owned(s.clone()),
        }
    }

    /// Decode row `row` of `array`.
    ///
    /// Cells of a nullable column come back wrapped in [`Value::Optional`].
    #[must_use]
    pub fn from_array(array: &'a ArrayRef, row: usize, nullable: bool) -> Self {
        if nullable {
            if array.is_null(row) {
                return Value::Optional(None);
            }
            return Value::Optional(Some(Box::new(Self::decode(array, row))));
        }
        if array.is_null(row) {
            return Value::Null;
        }
        Self::decode(array, row)
    }

    fn decode(array: &'a ArrayRef, row: usize) -> Self {
        match array.data_type() {
            DataType::Null => Value::Null,
            DataType::Utf8 => Value::Str(array.as_string::<i32>().value(row)),
            DataType::LargeUtf8 => Value::Str(array.as_string::<i64>().value(row)),
            DataType::Utf8View => Value::Str(array.as_string_view().value(row)),
            DataType::Int8 => Value::Int(i64::from(array.as_primitive::<Int8Type>().value(row))),
            DataType::Int16 => Value::Int(i64::from(array.as_primitive::<Int16Type>().value(row))),
            DataType::Int32 => Value::Int(i64::from(array.as_primitive::<Int32Type>().value(row))),
            DataType::Int64 => Value::Int(array.as_primitive::<Int64Type>().value(row)),
            DataType::UInt8 => {
                Value::UInt(u64::from(array.as_primitive::<UInt8Type>().value(row)))
            }
            DataType::UInt16 => {
                Value::UInt(u64::from(array.as_primitive::<UInt16Type>().value(row)))
            }
            DataType::UInt32 => {
                Value::UInt(u64::from(array.as_primitive::<UInt32Type>().value(row)))
            }
            DataType::UInt64 => Value::UInt(array.as_primitive::<UInt64Type>().value(row)),
            DataType::Binary => Value::Bytes(array.as_binary::<i32>().value(row)),
            DataType::LargeBinary => Value::Bytes(array.as_binary::<i64>().value(row)),
            DataType::BinaryView => Value::Bytes(array.as_binary_view().value(row)),
            DataType::FixedSizeBinary(_) => {
                Value::Bytes(array.as_fixed_size_binary().value(row))
            }
            DataType::Float16 => {
                Value::Float32(array.as_primitive::<Float16Type>().value(row).to_f32())
            }
            DataType::Float32 => Value::Float32(array.as_primitive::<Float32Type>().value(row)),
            DataType::Float64 => Value::Float64(array.as_primitive::<Float64Type>().value(row)),
            DataType::Boolean => Value::Bool(array.as_boolean().value(row)),
            DataType::Timestamp(unit, _) => {
                let raw = match unit {
                    TimeUnit::Second => array.as_primitive::<TimestampSecondType>().value(row),
                    TimeUnit::Millisecond => {
                        array.as_primitive::<TimestampMillisecondType>().value(row)
                    }
                    TimeUnit::Microsecond => {
                        array.as_primitive::<TimestampMicrosecondType>().value(row)
                    }
                    TimeUnit::Nanosecond => {
                        array.as_primitive::<TimestampNanosecondType>().value(row)
                    }
                };
                timestamp(raw, *unit).map_or_else(|| generic(array, row), Value::Timestamp)
            }
            _ => generic(array, row),
        }
    }
}

fn generic(array: &ArrayRef, row: usize) -> Value<'static> {
    Value::Other(array_value_to_string(array, row).unwrap_or_default())
}

/// Instant for a raw timestamp in `unit` since the Unix epoch. Timezone metadata is
/// ignored: the stored value is always UTC.
fn timestamp(raw: i64, unit: TimeUnit) -> Option<DateTime<Utc>> {
    let per_sec: i64 = match unit {
        TimeUnit::Second => 1,
        TimeUnit::Millisecond => 1_000,
        TimeUnit::Microsecond => 1_000_000,
        TimeUnit::Nanosecond => 1_000_000_000,
    };
    let secs = raw.div_euclid(per_sec);
    let nanos = raw.rem_euclid(per_sec) * (1_000_000_000 / per_sec);
    DateTime::from_timestamp(secs, u32::try_from(nanos).ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{
        BinaryArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array,
        StringArray, TimestampMillisecondArray, UInt16Array,
    };
    use chrono::TimeZone;
    use std::sync::Arc;

    #[test]
    fn stringification_table() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 5).unwrap();
        let cases: Vec<(Value<'_>, &str)> = vec![
            (Value::Null, ""),
            (Value::Int(42), "42"),
            (Value::UInt(42), "42"),
            (Value::Float64(3.14), "3.14"),
            (Value::Bool(true), "true"),
            (Value::Bool(false), "false"),
            (Value::Bytes(b"ab"), "ab"),
            (Value::Str("verbatim, \"as is\""), "verbatim, \"as is\""),
            (Value::Timestamp(ts), "2024-03-09T12:30:05Z"),
            (Value::Optional(None), ""),
            (Value::Optional(Some(Box::new(Value::Int(-7)))), "-7"),
            (Value::Other("2024-01-01".into()), "2024-01-01"),
        ];
        for (v, want) in cases {
            assert_eq!(v.to_text(), want, "{v:?}");
        }
    }

    #[test]
    fn floats_are_shortest_round_trip() {
        assert_eq!(Value::Float32(0.1).to_text(), "0.1");
        assert_eq!(Value::Float64(0.1 + 0.2).to_text(), "0.30000000000000004");
        assert_eq!(Value::Float64(-2.0).to_text(), "-2");
        let f: f32 = Value::Float32(1.1).to_text().parse().unwrap();
        assert_eq!(f, 1.1);
    }

    #[test]
    fn sub_second_timestamps_keep_fraction() {
        let ts = timestamp(1_500, TimeUnit::Millisecond).unwrap();
        assert_eq!(
            Value::Timestamp(ts).to_text(),
            "1970-01-01T00:00:01.500Z"
        );
        let before_epoch = timestamp(-1, TimeUnit::Second).unwrap();
        assert_eq!(
            Value::Timestamp(before_epoch).to_text(),
            "1969-12-31T23:59:59Z"
        );
    }

    #[test]
    fn decodes_arrow_cells() {
        let ints: ArrayRef = Arc::new(Int32Array::from(vec![Some(42), None]));
        assert_eq!(Value::from_array(&ints, 0, false), Value::Int(42));
        assert_eq!(Value::from_array(&ints, 1, false), Value::Null);
        assert_eq!(Value::from_array(&ints, 1, true), Value::Optional(None));
        assert_eq!(Value::from_array(&ints, 0, true).to_text(), "42");

        let u: ArrayRef = Arc::new(UInt16Array::from(vec![42u16]));
        assert_eq!(Value::from_array(&u, 0, false), Value::UInt(42));

        let s: ArrayRef = Arc::new(StringArray::from(vec!["x"]));
        assert_eq!(Value::from_array(&s, 0, false), Value::Str("x"));

        let b: ArrayRef = Arc::new(BinaryArray::from(vec![&b"ab"[..]]));
        assert_eq!(Value::from_array(&b, 0, false).to_text(), "ab");

        let f32s: ArrayRef = Arc::new(Float32Array::from(vec![2.5f32]));
        assert_eq!(Value::from_array(&f32s, 0, false), Value::Float32(2.5));
        let f64s: ArrayRef = Arc::new(Float64Array::from(vec![3.14]));
        assert_eq!(Value::from_array(&f64s, 0, false).to_text(), "3.14");

        let bools: ArrayRef = Arc::new(BooleanArray::from(vec![true]));
        assert_eq!(Value::from_array(&bools, 0, false).to_text(), "true");

        let ts: ArrayRef = Arc::new(TimestampMillisecondArray::from(vec![0i64]));
        assert_eq!(
            Value::from_array(&ts, 0, false).to_text(),
            "1970-01-01T00:00:00Z"
        );
    }

    #[test]
    fn unknown_kinds_use_generic_rendering() {
        let dates: ArrayRef = Arc::new(Date32Array::from(vec![19_723]));
        let v = Value::from_array(&dates, 0, false);
        assert!(matches!(v, Value::Other(_)));
        assert_eq!(v.to_text(), "2024-01-01");
    }
}
