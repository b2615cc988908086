//! Data-file name detection and compressed sinks
//!
//! A data-file name is `<stem>.<format>[.<codec>]`: `reduced.csv`,
//! `reduced.json.gz`, `reduced.csv.zst`. Compression needs the
//! `compression` feature (on by default).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[cfg(feature = "compression")]
use flate2::write::GzEncoder;

use super::OutputFormat;
use crate::{Error, Result};

/// Stream compression wrapped around a data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    /// Written as is
    #[default]
    None,
    /// gzip (`.gz`, `.gzip`)
    Gzip,
    /// Zstandard (`.zst`, `.zstd`)
    Zstd,
}

impl Codec {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "gz" | "gzip" => Some(Self::Gzip),
            "zst" | "zstd" => Some(Self::Zstd),
            _ => None,
        }
    }

    /// Fail early if this build cannot write the codec.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a compressed codec when the
    /// `compression` feature is disabled
    pub fn ensure_available(self) -> Result<()> {
        if self == Self::None || cfg!(feature = "compression") {
            Ok(())
        } else {
            Err(Error::Configuration(format!(
                "{self:?} output needs tb-reducer built with the `compression` feature"
            )))
        }
    }
}

const DATA_EXTENSIONS: [&str; 5] = ["csv", "json", "parquet", "xls", "xlsx"];

fn lowercase_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Split an output path into its layout and compression codec.
///
/// Paths that name no data format are event-directory prefixes.
///
/// # Errors
///
/// Returns [`Error::Configuration`] for Excel files, compressed Parquet,
/// compression suffixes without a `.csv`/`.json` data format, and data files
/// with an unsupported compression suffix (e.g. `.csv.bz2`)
pub fn detect(path: &Path) -> Result<(OutputFormat, Codec)> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let Some(ext) = lowercase_extension(name) else {
        return Ok((OutputFormat::EventDirs, Codec::None));
    };
    let stem = Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    let inner = lowercase_extension(stem);
    let bad = |detail: String| -> Result<(OutputFormat, Codec)> {
        Err(Error::Configuration(format!("'{}': {detail}", path.display())))
    };

    let (format_ext, codec) = match Codec::from_extension(&ext) {
        Some(codec) => match inner {
            Some(inner) => (inner, codec),
            None => return bad(format!("'.{ext}' compression needs a .csv or .json file name")),
        },
        None => {
            if !DATA_EXTENSIONS.contains(&ext.as_str())
                && inner.as_deref().is_some_and(|inner| DATA_EXTENSIONS.contains(&inner))
            {
                return bad(format!("unsupported compression '.{ext}', use .gz or .zst"));
            }
            (ext, Codec::None)
        }
    };

    match (format_ext.as_str(), codec) {
        ("csv", codec) => Ok((OutputFormat::Csv, codec)),
        ("json", codec) => Ok((OutputFormat::Json, codec)),
        ("parquet", Codec::None) => Ok((OutputFormat::Parquet, Codec::None)),
        ("parquet", _) => {
            bad("Parquet is compressed internally, drop the outer compression suffix".to_string())
        }
        ("xls" | "xlsx", _) => {
            bad("Excel output is not supported, write .csv or .parquet instead".to_string())
        }
        (_, Codec::None) => Ok((OutputFormat::EventDirs, Codec::None)),
        (other, _) => bad(format!("cannot compress '.{other}', expected .csv or .json")),
    }
}

/// Output stream of a data file, compressed per [`Codec`].
pub(crate) enum Sink {
    Plain(BufWriter<File>),
    #[cfg(feature = "compression")]
    Gzip(GzEncoder<BufWriter<File>>),
    #[cfg(feature = "compression")]
    Zstd(zstd::Encoder<'static, BufWriter<File>>),
}

impl Sink {
    pub(crate) fn create(path: &Path, codec: Codec) -> Result<Self> {
        codec.ensure_available()?;
        let out = BufWriter::new(File::create(path)?);
        match codec {
            Codec::None => Ok(Self::Plain(out)),
            #[cfg(feature = "compression")]
            Codec::Gzip => Ok(Self::Gzip(GzEncoder::new(out, flate2::Compression::default()))),
            #[cfg(feature = "compression")]
            Codec::Zstd => Ok(Self::Zstd(zstd::Encoder::new(out, 0)?)),
            #[cfg(not(feature = "compression"))]
            Codec::Gzip | Codec::Zstd => Ok(Self::Plain(out)),
        }
    }

    /// Write the compression trailer and flush the file.
    pub(crate) fn finish(self) -> Result<()> {
        let mut out = match self {
            Self::Plain(out) => out,
            #[cfg(feature = "compression")]
            Self::Gzip(encoder) => encoder.finish()?,
            #[cfg(feature = "compression")]
            Self::Zstd(encoder) => encoder.finish()?,
        };
        out.flush()?;
        Ok(())
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(out) => out.write(buf),
            #[cfg(feature = "compression")]
            Self::Gzip(encoder) => encoder.write(buf),
            #[cfg(feature = "compression")]
            Self::Zstd(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(out) => out.flush(),
            #[cfg(feature = "compression")]
            Self::Gzip(encoder) => encoder.flush(),
            #[cfg(feature = "compression")]
            Self::Zstd(encoder) => encoder.flush(),
        }
    }
}
