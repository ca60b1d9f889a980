//! Runtime statistics for a conversion run.
//!
//! A [`RunStatistics`] is filled in by the pipeline entry points in [`crate::convert`]
//! and returned inside their report. It can be rendered as the one-line summary the CLI
//! prints in verbose mode, as JSON, or saved to a file.
//!
//! ```
//! use parquet2csv::metrics::{RunStatistics, format_file_size};
//!
//! let mut stats = RunStatistics::start("data.csv", "parquet");
//! stats.rows_read = 3;
//! stats.finish();
//! assert!(stats.summary().starts_with("data.csv ("));
//! assert_eq!(format_file_size(1024), "1.00 Kb");
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Value, json};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Counters and timing of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatistics {
    /// Input file the run converted.
    pub input: PathBuf,
    /// Command name, `parquet` or `csv`.
    pub command: String,
    /// Input size in bytes at the end of the run.
    pub input_bytes: u64,
    /// Text batches (forward) or Parquet chunks (reverse) consumed.
    pub batches: u64,
    /// Data rows read, header excluded.
    pub rows_read: u64,
    /// Data rows written, header excluded.
    pub rows_written: u64,
    pub forced_flushes: u64,
    pub final_flushes: u64,
    /// Nested columns that were not converted.
    pub skipped_columns: Vec<String>,
    #[serde(skip)]
    started: Instant,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    elapsed: Option<Duration>,
}

fn as_millis<S: serde::Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        None => s.serialize_none(),
    }
}

impl RunStatistics {
    /// Start the clock for a run of `command` over `input`.
    pub fn start(input: impl Into<PathBuf>, command: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            command: command.into(),
            input_bytes: 0,
            batches: 0,
            rows_read: 0,
            rows_written: 0,
            forced_flushes: 0,
            final_flushes: 0,
            skipped_columns: Vec::new(),
            started: Instant::now(),
            elapsed: None,
        }
    }

    /// Stop the clock and record the input size.
    pub fn finish(&mut self) {
        self.elapsed = Some(self.started.elapsed());
        self.input_bytes = fs::metadata(&self.input).map_or(0, |m| m.len());
    }

    /// Time from `start` to `finish`, or until now while the run is going.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }

    /// `<input> (<size>): <command> Processed <elapsed>`
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): {} Processed {}",
            self.input.display(),
            format_file_size(self.input_bytes),
            self.command,
            format_elapsed(self.elapsed()),
        )
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| json!({ "error": e.to_string() }))
    }

    /// Print the summary line to stdout.
    pub fn print(&self) {
        println!("{}", self.summary());
    }

    /// Save the statistics as pretty JSON.
    ///
    /// # Errors
    /// The file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let formatted = serde_json::to_string_pretty(self).context("serialize statistics")?;
        file.write_all(formatted.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}

/// Human file size with two decimals: `Kb` below 1 MiB, `Mb` below 1 GiB, else `Gb`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * KB;
    const GB: f64 = MB * KB;
    let size = bytes as f64;
    if size < MB {
        format!("{:.2} Kb", size / KB)
    } else if size < GB {
        format!("{:.2} Mb", size / MB)
    } else {
        format!("{:.2} Gb", size / GB)
    }
}

/// Duration rounded to whole seconds, e.g. `0s`, `42s`, `3m5s`, `1h0m12s`.
#[must_use]
pub fn format_elapsed(d: Duration) -> String {
    let mut secs = d.as_secs();
    if d.subsec_millis() >= 500 {
        secs += 1;
    }
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sizes() {
        let cases = [
            (0, "0.00 Kb"),
            (512, "0.50 Kb"),
            (1024, "1.00 Kb"),
            (1_048_576, "1.00 Mb"),
            (1_572_864, "1.50 Mb"),
            (1_073_741_824, "1.00 Gb"),
            (5_368_709_120, "5.00 Gb"),
        ];
        for (bytes, want) in cases {
            assert_eq!(format_file_size(bytes), want, "{bytes}");
        }
    }

    #[test]
    fn elapsed_rounds_to_seconds() {
        assert_eq!(format_elapsed(Duration::from_millis(400)), "0s");
        assert_eq!(format_elapsed(Duration::from_millis(1_600)), "2s");
        assert_eq!(format_elapsed(Duration::from_secs(185)), "3m5s");
        assert_eq!(format_elapsed(Duration::from_secs(3_612)), "1h0m12s");
    }

    #[test]
    fn json_has_counters() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("in.csv");
        fs::write(&input, b"a\n1\n")?;
        let mut stats = RunStatistics::start(&input, "parquet");
        stats.rows_read = 1;
        stats.rows_written = 1;
        stats.finish();
        let v = stats.to_json();
        assert_eq!(v["rows_written"], 1);
        assert_eq!(v["input_bytes"], 4);
        assert!(v["elapsed_ms"].is_u64());

        let out = dir.path().join("stats.json");
        stats.save_to_file(&out)?;
        let back: Value = serde_json::from_str(&fs::read_to_string(&out)?)?;
        assert_eq!(back["command"], "parquet");
        Ok(())
    }
}
