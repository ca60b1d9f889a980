//! Path checks and output name derivation done before a run starts.
//!
//! Text paths may carry a compression suffix known to the [`CodecRegistry`]
//! (`events.csv.gz` counts as a `.csv` file).

use crate::error::ConvertError;
use crate::io::compression::CodecRegistry;
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of delimited text.
pub const TEXT_EXT: &str = ".csv";
/// File extension of Parquet files.
pub const PARQUET_EXT: &str = ".parquet";

fn ends_with_ext(path: &str, ext: &str) -> bool {
    path.len()
        .checked_sub(ext.len())
        .is_some_and(|cut| path.is_char_boundary(cut) && path[cut..].eq_ignore_ascii_case(ext))
}

/// Check that `input` names an existing file with extension `ext`.
///
/// # Errors
/// Wrong extension, missing source, or a source that is not a regular file.
pub fn validate_input(input: &Path, ext: &str, codecs: &CodecRegistry) -> Result<(), ConvertError> {
    let bare = codecs.strip_extension(input);
    if !ends_with_ext(&bare, ext) {
        return Err(ConvertError::invalid(format!(
            "{} is not a {} file",
            input.display(),
            ext.trim_start_matches('.')
        )));
    }
    let meta = fs::metadata(input).map_err(|e| {
        ConvertError::invalid(format!("input file {} does not exist: {e}", input.display()))
    })?;
    if !meta.is_file() {
        return Err(ConvertError::invalid(format!(
            "input {} is not a regular file",
            input.display()
        )));
    }
    Ok(())
}

/// Check that the directory `output` will be created in exists and can be written.
///
/// # Errors
/// Missing, non-directory or read-only destination directory.
pub fn validate_output_dir(output: &Path) -> Result<(), ConvertError> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let meta = fs::metadata(dir).map_err(|_| {
        ConvertError::invalid(format!("destination directory {} does not exist", dir.display()))
    })?;
    if !meta.is_dir() {
        return Err(ConvertError::invalid(format!(
            "destination {} is not a directory",
            dir.display()
        )));
    }
    if meta.permissions().readonly() {
        return Err(ConvertError::invalid(format!(
            "destination directory {} is not writable",
            dir.display()
        )));
    }
    Ok(())
}

/// Output path for a conversion from `input` to files with extension `target_ext`.
///
/// Without an explicit output, the input's extension (and compression suffix) is
/// replaced by `target_ext` next to the input. An explicit output gets `target_ext`
/// appended unless it already ends with it.
#[must_use]
pub fn derive_output(
    input: &Path,
    output: Option<&Path>,
    target_ext: &str,
    codecs: &CodecRegistry,
) -> PathBuf {
    if let Some(out) = output {
        let s = out.to_string_lossy();
        if ends_with_ext(&codecs.strip_extension(out), target_ext) {
            return out.to_path_buf();
        }
        return PathBuf::from(format!("{s}{target_ext}"));
    }
    let bare = PathBuf::from(codecs.strip_extension(input));
    bare.with_extension(target_ext.trim_start_matches('.'))
}
