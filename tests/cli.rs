use parquet2csv::testing::{
    read_parquet_strings, read_text_fixture, sample_table, write_text_fixture,
};
use std::process::Command;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_parquet2csv"))
}

#[test]
fn test_cli_converts_both_ways_with_default_names() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("table.csv");
    let table = sample_table(12);
    write_text_fixture(&input, &table, b'|')?;

    let out = bin()
        .args(["parquet", "-d", "|", "-c", "1", "-f", "5", "-v"])
        .arg(&input)
        .output()?;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let parquet = tmp.path().join("table.parquet");
    let (_, rows) = read_parquet_strings(&parquet)?;
    assert_eq!(rows, table[1..]);
    let stdout = String::from_utf8(out.stdout)?;
    assert!(stdout.contains("parquet Processed"), "{stdout}");

    let back = tmp.path().join("again");
    let out = bin().arg("csv").arg(&parquet).arg(&back).output()?;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let rows = read_text_fixture(tmp.path().join("again.csv"), b',')?;
    assert_eq!(rows, table);
    Ok(())
}

#[test]
fn test_cli_failure_exits_with_status_one() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = tmp.path().join("notes.txt");
    std::fs::write(&input, "a\n")?;

    let out = bin().arg("parquet").arg(&input).output()?;
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8(out.stderr)?;
    assert!(stderr.contains("is not a csv file"), "{stderr}");

    let out = bin().args(["csv", "-c", "9", "x.parquet"]).output()?;
    assert_eq!(out.status.code(), Some(1));
    Ok(())
}
