//! Transparent compression for delimited-text inputs and outputs.
//!
//! The text side of a conversion may be compressed (`data.csv.gz`, `out.csv.zst`, ...).
//! A [`CodecRegistry`] picks a [`TextCodec`] by file extension and, for reads, falls back
//! to magic-byte sniffing. Parquet's own column compression is unrelated; see
//! [`crate::config::ParquetCodec`].
//!
//! ## Built-in codecs
//!
//! When enabled via feature flags:
//! - **Gzip** (`.gz`) - via `flate2` (feature: `compression-gzip`)
//! - **Zstd** (`.zst`) - via `zstd` (feature: `compression-zstd`)
//! - **Bzip2** (`.bz2`) - via `bzip2` (feature: `compression-bzip2`)
//! - **Xz** (`.xz`) - via `xz2` (feature: `compression-xz`)
//!
//! ## Custom codecs
//! ```
//! use parquet2csv::io::compression::{CodecRegistry, FinishWrite, TextCodec};
//! use std::io::{Read, Write};
//! use std::sync::Arc;
//!
//! struct Identity;
//!
//! impl TextCodec for Identity {
//!     fn name(&self) -> &str { "identity" }
//!     fn extensions(&self) -> &[&str] { &[".ident"] }
//!     fn magic_bytes(&self) -> Option<&[u8]> { None }
//!     fn wrap_reader(&self, r: Box<dyn Read + Send>) -> std::io::Result<Box<dyn Read + Send>> {
//!         Ok(r)
//!     }
//!     fn wrap_writer(&self, w: Box<dyn Write + Send>) -> std::io::Result<Box<dyn FinishWrite>> {
//!         Ok(Box::new(std::io::BufWriter::new(w)))
//!     }
//! }
//!
//! let mut codecs = CodecRegistry::default();
//! codecs.register(Arc::new(Identity));
//! assert_eq!(codecs.detect_from_extension("a.csv.ident").unwrap().name(), "identity");
//! ```

use anyhow::{Context, Result};
use std::fmt;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

/// A text output that must be finished explicitly.
///
/// Compressed streams end with a trailer. [`FinishWrite::finish`] writes it and flushes
/// the file underneath, so a failure there reaches the caller instead of being lost in
/// `Drop`.
pub trait FinishWrite: Write + Send {
    /// Write any trailer and flush everything down to the underlying writer.
    ///
    /// # Errors
    /// The trailer or the final flush could not be written.
    fn finish(self: Box<Self>) -> std::io::Result<()>;
}

impl<W: Write + Send> FinishWrite for BufWriter<W> {
    fn finish(self: Box<Self>) -> std::io::Result<()> {
        let mut inner = (*self)
            .into_inner()
            .map_err(std::io::IntoInnerError::into_error)?;
        inner.flush()
    }
}

/// Pluggable stream codec for text files.
pub trait TextCodec: Send + Sync {
    /// Human-readable codec name (e.g., "gzip").
    fn name(&self) -> &str;

    /// Lowercase file extensions with the leading dot (e.g., `&[".gz"]`).
    fn extensions(&self) -> &[&str];

    /// Magic bytes at the start of a compressed stream, if the format has them.
    fn magic_bytes(&self) -> Option<&[u8]>;

    /// Wrap a reader with decompression.
    fn wrap_reader(&self, reader: Box<dyn Read + Send>) -> std::io::Result<Box<dyn Read + Send>>;

    /// Wrap a writer with compression. Callers end the stream with [`FinishWrite::finish`].
    fn wrap_writer(&self, writer: Box<dyn Write + Send>) -> std::io::Result<Box<dyn FinishWrite>>;
}

/// Ordered set of text codecs consulted during detection.
///
/// [`CodecRegistry::default`] holds every built-in codec enabled at compile time;
/// [`CodecRegistry::empty`] holds none (all text is treated as plain).
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: Vec<Arc<dyn TextCodec>>,
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.codecs.iter().map(|c| c.name().to_string()))
            .finish()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self {
            codecs: vec![
                #[cfg(feature = "compression-gzip")]
                Arc::new(GzipCodec),
                #[cfg(feature = "compression-zstd")]
                Arc::new(ZstdCodec),
                #[cfg(feature = "compression-bzip2")]
                Arc::new(Bzip2Codec),
                #[cfg(feature = "compression-xz")]
                Arc::new(XzCodec),
            ],
        }
    }
}

impl CodecRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Add a codec. Later registrations are consulted after earlier ones.
    pub fn register(&mut self, codec: Arc<dyn TextCodec>) {
        self.codecs.push(codec);
    }

    /// First codec whose extension ends the path (case-insensitive).
    pub fn detect_from_extension(&self, path: impl AsRef<Path>) -> Option<Arc<dyn TextCodec>> {
        let path_str = path.as_ref().to_string_lossy().to_lowercase();
        self.codecs
            .iter()
            .find(|c| c.extensions().iter().any(|ext| path_str.ends_with(ext)))
            .cloned()
    }

    /// Path with a recognized codec extension removed, e.g. `a.csv.gz` → `a.csv`.
    #[must_use]
    pub fn strip_extension(&self, path: &Path) -> String {
        let s = path.to_string_lossy();
        for codec in &self.codecs {
            for ext in codec.extensions() {
                let Some(cut) = s.len().checked_sub(ext.len()) else {
                    continue;
                };
                if s.is_char_boundary(cut) && s[cut..].eq_ignore_ascii_case(ext) {
                    return s[..cut].to_string();
                }
            }
        }
        s.into_owned()
    }

    fn detect_from_magic<R: BufRead>(&self, reader: &mut R) -> Option<Arc<dyn TextCodec>> {
        let buf = reader.fill_buf().ok()?;
        if buf.is_empty() {
            return None;
        }
        self.codecs
            .iter()
            .find(|c| c.magic_bytes().is_some_and(|m| buf.starts_with(m)))
            .cloned()
    }

    /// Wrap `reader` with decompression chosen by extension, then by magic bytes.
    ///
    /// # Errors
    /// Returns an error if the codec fails to initialize its decoder.
    pub fn reader<R: Read + Send + 'static>(
        &self,
        reader: R,
        path_hint: impl AsRef<Path>,
    ) -> Result<Box<dyn Read + Send>> {
        if let Some(codec) = self.detect_from_extension(&path_hint) {
            return codec
                .wrap_reader(Box::new(reader))
                .with_context(|| format!("wrap reader with {} codec", codec.name()));
        }

        let mut buf_reader = BufReader::new(reader);
        if let Some(codec) = self.detect_from_magic(&mut buf_reader) {
            return codec
                .wrap_reader(Box::new(buf_reader))
                .with_context(|| format!("wrap reader with {} codec", codec.name()));
        }

        Ok(Box::new(buf_reader))
    }

    /// Wrap `writer` with compression chosen by extension; plain text gets a `BufWriter`.
    ///
    /// # Errors
    /// Returns an error if the codec fails to initialize its encoder.
    pub fn writer<W: Write + Send + 'static>(
        &self,
        writer: W,
        path_hint: impl AsRef<Path>,
    ) -> Result<Box<dyn FinishWrite>> {
        if let Some(codec) = self.detect_from_extension(&path_hint) {
            return codec
                .wrap_writer(Box::new(writer))
                .with_context(|| format!("wrap writer with {} codec", codec.name()));
        }
        Ok(Box::new(BufWriter::new(writer)))
    }
}

// ============================================================================
// Built-in codecs
// ============================================================================

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl TextCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap_reader(&self, reader: Box<dyn Read + Send>) -> std::io::Result<Box<dyn Read + Send>> {
        use flate2::read::MultiGzDecoder;
        Ok(Box::new(MultiGzDecoder::new(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn Write + Send>) -> std::io::Result<Box<dyn FinishWrite>> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        Ok(Box::new(GzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-gzip")]
impl<W: Write + Send> FinishWrite for flate2::write::GzEncoder<W> {
    fn finish(self: Box<Self>) -> std::io::Result<()> {
        flate2::write::GzEncoder::finish(*self)?.flush()
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl TextCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn extensions(&self) -> &[&str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x28, 0xb5, 0x2f, 0xfd])
    }

    fn wrap_reader(&self, reader: Box<dyn Read + Send>) -> std::io::Result<Box<dyn Read + Send>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read + Send>)
    }

    fn wrap_writer(&self, writer: Box<dyn Write + Send>) -> std::io::Result<Box<dyn FinishWrite>> {
        zstd::stream::write::Encoder::new(writer, 3).map(|e| Box::new(e) as Box<dyn FinishWrite>)
    }
}

#[cfg(feature = "compression-zstd")]
impl<W: Write + Send> FinishWrite for zstd::stream::write::Encoder<'static, W> {
    fn finish(self: Box<Self>) -> std::io::Result<()> {
        zstd::stream::write::Encoder::finish(*self)?.flush()
    }
}

#[cfg(feature = "compression-bzip2")]
struct Bzip2Codec;

#[cfg(feature = "compression-bzip2")]
impl TextCodec for Bzip2Codec {
    fn name(&self) -> &str {
        "bzip2"
    }

    fn extensions(&self) -> &[&str] {
        &[".bz2", ".bzip2"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(b"BZh")
    }

    fn wrap_reader(&self, reader: Box<dyn Read + Send>) -> std::io::Result<Box<dyn Read + Send>> {
        use bzip2::read::MultiBzDecoder;
        Ok(Box::new(MultiBzDecoder::new(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn Write + Send>) -> std::io::Result<Box<dyn FinishWrite>> {
        use bzip2::Compression;
        use bzip2::write::BzEncoder;
        Ok(Box::new(BzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-bzip2")]
impl<W: Write + Send> FinishWrite for bzip2::write::BzEncoder<W> {
    fn finish(self: Box<Self>) -> std::io::Result<()> {
        bzip2::write::BzEncoder::finish(*self)?.flush()
    }
}

#[cfg(feature = "compression-xz")]
struct XzCodec;

#[cfg(feature = "compression-xz")]
impl TextCodec for XzCodec {
    fn name(&self) -> &str {
        "xz"
    }

    fn extensions(&self) -> &[&str] {
        &[".xz"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00])
    }

    fn wrap_reader(&self, reader: Box<dyn Read + Send>) -> std::io::Result<Box<dyn Read + Send>> {
        use xz2::read::XzDecoder;
        Ok(Box::new(XzDecoder::new_multi_decoder(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn Write + Send>) -> std::io::Result<Box<dyn FinishWrite>> {
        use xz2::write::XzEncoder;
        Ok(Box::new(XzEncoder::new(writer, 6)))
    }
}

#[cfg(feature = "compression-xz")]
impl<W: Write + Send> FinishWrite for xz2::write::XzEncoder<W> {
    fn finish(self: Box<Self>) -> std::io::Result<()> {
        xz2::write::XzEncoder::finish(*self)?.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn plain_text_passes_through() -> Result<()> {
        let codecs = CodecRegistry::default();
        let mut r = codecs.reader(&b"a,b\n1,2\n"[..], "in.csv")?;
        let mut s = String::new();
        r.read_to_string(&mut s)?;
        assert_eq!(s, "a,b\n1,2\n");
        Ok(())
    }

    #[test]
    fn empty_registry_detects_nothing() {
        let codecs = CodecRegistry::empty();
        assert!(codecs.detect_from_extension("x.csv.gz").is_none());
        assert_eq!(codecs.strip_extension(&PathBuf::from("x.csv.gz")), "x.csv.gz");
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn strips_codec_suffix() {
        let codecs = CodecRegistry::default();
        assert_eq!(codecs.strip_extension(&PathBuf::from("dir/x.csv.GZ")), "dir/x.csv");
        assert_eq!(codecs.strip_extension(&PathBuf::from("x.csv")), "x.csv");
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn gzip_detected_by_magic_without_extension() -> Result<()> {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"h1,h2\n")?;
        let bytes = enc.finish()?;

        let codecs = CodecRegistry::default();
        let mut r = codecs.reader(std::io::Cursor::new(bytes), "noext")?;
        let mut s = String::new();
        r.read_to_string(&mut s)?;
        assert_eq!(s, "h1,h2\n");
        Ok(())
    }

    /// Accepts writes until `full` is set.
    struct FillingDisk {
        full: Arc<std::sync::atomic::AtomicBool>,
    }

    impl Write for FillingDisk {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.full.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(std::io::Error::other("no space left on device"));
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn finish_reports_a_failed_trailer() -> Result<()> {
        use std::sync::atomic::{AtomicBool, Ordering};

        let codecs = CodecRegistry::default();
        for name in ["out.csv", "out.csv.gz", "out.csv.zst", "out.csv.bz2", "out.csv.xz"] {
            let compressed = codecs.detect_from_extension(name).is_some();
            if name != "out.csv" && !compressed {
                continue;
            }
            let full = Arc::new(AtomicBool::new(false));
            let disk = FillingDisk {
                full: Arc::clone(&full),
            };
            let mut w = codecs.writer(disk, name)?;
            w.write_all(b"id,name\n1,a\n")?;
            w.flush()?;
            full.store(true, Ordering::SeqCst);
            let res = w.finish();
            // plain output has nothing left to write after a flush
            assert_eq!(res.is_err(), compressed, "{name}");
        }
        Ok(())
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn finished_gzip_decodes() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("t.csv.gz");
        let codecs = CodecRegistry::default();
        let mut w = codecs.writer(std::fs::File::create(&path)?, &path)?;
        w.write_all(b"a\n1\n")?;
        w.finish()?;

        let mut s = String::new();
        codecs
            .reader(std::fs::File::open(&path)?, &path)?
            .read_to_string(&mut s)?;
        assert_eq!(s, "a\n1\n");
        Ok(())
    }
}
