use arrow::array::{
    ArrayRef, BinaryArray, BooleanArray, Float32Array, Float64Array, Int8Array, Int64Array,
    ListArray, StringArray, TimestampMicrosecondArray, UInt32Array,
};
use arrow::array::Array;
use arrow::datatypes::{DataType, Field, Int32Type, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet2csv::io::CodecRegistry;
use parquet2csv::testing::{read_text_fixture, write_parquet_fixture};
use parquet2csv::{ConvertConfig, ErrorKind, error_kind, parquet_to_csv};
use std::fs;
use std::sync::Arc;

fn typed_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Small", DataType::Int8, false),
        Field::new("Big", DataType::Int64, true),
        Field::new("Count", DataType::UInt32, false),
        Field::new("Ratio", DataType::Float64, false),
        Field::new("Half", DataType::Float32, false),
        Field::new("Flag", DataType::Boolean, false),
        Field::new("Blob", DataType::Binary, false),
        Field::new("Label", DataType::Utf8, true),
        Field::new(
            "At",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int8Array::from(vec![-1, 42])),
        Arc::new(Int64Array::from(vec![Some(9_007_199_254_740_993), None])),
        Arc::new(UInt32Array::from(vec![42, u32::MAX])),
        Arc::new(Float64Array::from(vec![2.5, 0.1 + 0.2])),
        Arc::new(Float32Array::from(vec![0.5, 1.1])),
        Arc::new(BooleanArray::from(vec![true, false])),
        Arc::new(BinaryArray::from(vec![&b"ab"[..], &b""[..]])),
        Arc::new(StringArray::from(vec![None, Some("x, y")])),
        Arc::new(
            TimestampMicrosecondArray::from(vec![1_700_000_000_000_000, 1_700_000_000_250_000])
                .with_timezone("UTC"),
        ),
    ];
    RecordBatch::try_new(schema, columns).unwrap()
}

#[test]
fn test_typed_columns_render_canonically() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("typed.parquet");
    let output = tmp.path().join("typed.csv");
    write_parquet_fixture(&input, &typed_batch())?;

    let report = parquet_to_csv(&ConvertConfig::new(&input, &output), &CodecRegistry::default())?;
    assert_eq!(report.rows_written, 2);

    let rows = read_text_fixture(&output, b',')?;
    assert_eq!(
        rows[0],
        ["small", "big", "count", "ratio", "half", "flag", "blob", "label", "at"]
    );
    assert_eq!(
        rows[1],
        [
            "-1",
            "9007199254740993",
            "42",
            "2.5",
            "0.5",
            "true",
            "ab",
            "",
            "2023-11-14T22:13:20Z"
        ]
    );
    assert_eq!(
        rows[2],
        [
            "42",
            "",
            "4294967295",
            "0.30000000000000004",
            "1.1",
            "false",
            "",
            "x, y",
            "2023-11-14T22:13:20.250Z"
        ]
    );
    Ok(())
}

#[test]
fn test_zero_rows_produce_empty_file() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("empty.parquet");
    let output = tmp.path().join("empty.csv");
    let schema = Arc::new(Schema::new(vec![Field::new("a", DataType::Utf8, false)]));
    write_parquet_fixture(&input, &RecordBatch::new_empty(schema))?;

    let report = parquet_to_csv(&ConvertConfig::new(&input, &output), &CodecRegistry::default())?;
    assert_eq!(report.rows_written, 0);
    assert_eq!(fs::metadata(&output)?.len(), 0);
    Ok(())
}

#[test]
fn test_nested_columns_are_dropped() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("nested.parquet");
    let output = tmp.path().join("nested.csv");
    let tags = ListArray::from_iter_primitive::<Int32Type, _, _>(vec![
        Some(vec![Some(1), Some(2)]),
        Some(vec![]),
    ]);
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("tags", tags.data_type().clone(), true),
        Field::new("name", DataType::Utf8, false),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2])),
            Arc::new(tags),
            Arc::new(StringArray::from(vec!["a", "b"])),
        ],
    )?;
    write_parquet_fixture(&input, &batch)?;

    let report = parquet_to_csv(&ConvertConfig::new(&input, &output), &CodecRegistry::default())?;
    assert_eq!(report.skipped_columns, ["tags"]);
    let rows = read_text_fixture(&output, b',')?;
    assert_eq!(rows, [["id", "name"], ["1", "a"], ["2", "b"]]);
    Ok(())
}

#[test]
fn test_chunking_and_text_flushes() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("many.parquet");
    let output = tmp.path().join("many.tsv.csv");
    let schema = Arc::new(Schema::new(vec![Field::new("n", DataType::Int64, false)]));
    let batch = RecordBatch::try_new(
        schema,
        vec![Arc::new(Int64Array::from((0..95).collect::<Vec<i64>>()))],
    )?;
    write_parquet_fixture(&input, &batch)?;

    let config = ConvertConfig::new(&input, &output)
        .with_flush_rows(10)
        .with_delimiter('\t');
    let report = parquet_to_csv(&config, &CodecRegistry::default())?;
    assert_eq!(report.batches, 10);
    // header + 95 rows = 96 records, flushed at every 10th
    assert_eq!(report.forced_flushes, 9);
    assert_eq!(report.final_flushes, 1);

    let rows = read_text_fixture(&output, b'\t')?;
    assert_eq!(rows.len(), 96);
    assert_eq!(rows[95], ["94"]);
    Ok(())
}

#[cfg(feature = "compression-zstd")]
#[test]
fn test_compressed_text_output() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("t.parquet");
    let output = tmp.path().join("t.csv.zst");
    let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Utf8, false)]));
    let batch = RecordBatch::try_new(schema, vec![Arc::new(StringArray::from(vec!["a", "b"]))])?;
    write_parquet_fixture(&input, &batch)?;

    parquet_to_csv(&ConvertConfig::new(&input, &output), &CodecRegistry::default())?;
    assert_eq!(&fs::read(&output)?[..4], &[0x28, 0xb5, 0x2f, 0xfd]);
    let rows = read_text_fixture(&output, b',')?;
    assert_eq!(rows, [["v"], ["a"], ["b"]]);
    Ok(())
}

#[test]
fn test_not_parquet_is_rejected() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("fake.parquet");
    fs::write(&input, b"definitely,not\nparquet,data\n")?;
    let err = parquet_to_csv(
        &ConvertConfig::new(&input, tmp.path().join("o.csv")),
        &CodecRegistry::default(),
    )
    .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Io));
    Ok(())
}
