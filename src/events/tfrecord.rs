//! TFRecord framing used by TensorBoard event files
//!
//! Each record is laid out as:
//!
//! ```text
//! u64 LE  length
//! u32 LE  masked crc32c(length bytes)
//! [u8]    data
//! u32 LE  masked crc32c(data)
//! ```

use std::io::{self, Write};
use std::path::Path;

use tracing::warn;

use crate::{Error, Result};

const MASK_DELTA: u32 = 0xa282_ead8;
const LENGTH_LEN: usize = 8;
const CRC_LEN: usize = 4;
const HEADER_LEN: usize = LENGTH_LEN + CRC_LEN;

/// Masked CRC32C as stored in TFRecord files.
#[must_use]
pub fn masked_crc(data: &[u8]) -> u32 {
    let crc = crc32c::crc32c(data);
    ((crc >> 15) | (crc << 17)).wrapping_add(MASK_DELTA)
}

/// Append one framed record.
///
/// # Errors
///
/// Returns error if the underlying writer fails
pub fn write_record<W: Write>(out: &mut W, data: &[u8]) -> io::Result<()> {
    let len = (data.len() as u64).to_le_bytes();
    out.write_all(&len)?;
    out.write_all(&masked_crc(&len).to_le_bytes())?;
    out.write_all(data)?;
    out.write_all(&masked_crc(data).to_le_bytes())
}

/// Iterator over the record payloads of an in-memory event file.
///
/// A truncated final record ends iteration with a warning (the file may
/// still be written to). A checksum mismatch yields one error and stops.
pub struct RecordReader<'a> {
    path: &'a Path,
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    /// Create a reader over `buf`, the full contents of the file at `path`.
    #[must_use]
    pub const fn new(path: &'a Path, buf: &'a [u8]) -> Self {
        Self { path, buf, pos: 0 }
    }

    fn corrupt(&mut self, detail: String) -> Error {
        self.pos = self.buf.len();
        Error::CorruptEventFile {
            path: self.path.to_path_buf(),
            detail,
        }
    }

    fn truncated(&mut self) {
        warn!(
            path = %self.path.display(),
            offset = self.pos,
            "event file ends with a truncated record, ignoring it"
        );
        self.pos = self.buf.len();
    }
}

impl<'a> Iterator for RecordReader<'a> {
    type Item = Result<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        let buf: &'a [u8] = self.buf;
        let rest = &buf[self.pos..];
        if rest.is_empty() {
            return None;
        }
        if rest.len() < HEADER_LEN {
            self.truncated();
            return None;
        }

        let len_bytes = &rest[..LENGTH_LEN];
        if read_u32(&rest[LENGTH_LEN..HEADER_LEN]) != masked_crc(len_bytes) {
            let offset = self.pos;
            return Some(Err(
                self.corrupt(format!("length checksum mismatch at offset {offset}"))
            ));
        }

        let Ok(len) = usize::try_from(read_u64(len_bytes)) else {
            let offset = self.pos;
            return Some(Err(
                self.corrupt(format!("record length overflows at offset {offset}"))
            ));
        };
        let Some(total) = len.checked_add(HEADER_LEN + CRC_LEN) else {
            let offset = self.pos;
            return Some(Err(
                self.corrupt(format!("record length overflows at offset {offset}"))
            ));
        };
        if rest.len() < total {
            self.truncated();
            return None;
        }

        let data = &rest[HEADER_LEN..HEADER_LEN + len];
        if read_u32(&rest[HEADER_LEN + len..total]) != masked_crc(data) {
            let offset = self.pos;
            return Some(Err(
                self.corrupt(format!("data checksum mismatch at offset {offset}"))
            ));
        }

        self.pos += total;
        Some(Ok(data))
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(raw)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(raw)
}
