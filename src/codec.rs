//! # Byte Codec
//!
//! Low-level helpers shared by every on-disk reader and writer in the crate:
//! positioned reads that loop until the requested range is filled, small
//! little-endian field accessors for in-place header updates, fixed-width
//! ASCII string handling, and the 12-byte packed-decimal numeric key
//! encoding used by MDX tags.
//!
//! ## Positioned I/O
//!
//! All multi-byte integers in the DBF family are little-endian. Reads go
//! through [`read_exact_at`], which retries short reads until the buffer is
//! full and converts end-of-file into [`XbaseError::Truncated`]; a partial
//! structure is never returned to a caller.
//!
//! ## Packed-decimal keys
//!
//! MDX numeric tags with a 12-byte key length store values in a BCD-style
//! encoding:
//!
//! ```text
//! byte 0      size: 0x34 + digits left of the decimal point
//! byte 1      sign: 0x51 +dec, 0x29 +int, 0xD1 -dec, 0xA9 -int, 0x10 zero
//! bytes 2-10  up to 18 decimal digits, two per byte, high nibble first
//! byte 11     unused
//! ```
//!
//! [`decode_packed_decimal`] reverses this into an `f64`.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;

use crate::error::{Result, XbaseError};

/// Sign byte values for the packed-decimal encoding.
const SIGN_POSITIVE_WITH_DECIMAL: u8 = 0x51;
const SIGN_POSITIVE_WITHOUT_DECIMAL: u8 = 0x29;
const SIGN_NEGATIVE_WITH_DECIMAL: u8 = 0xd1;
const SIGN_NEGATIVE_WITHOUT_DECIMAL: u8 = 0xa9;
const SIGN_ZERO: u8 = 0x10;

/// Reads exactly `buf.len()` bytes starting at `offset`.
///
/// Short reads are retried until the buffer is filled. Reaching end of file
/// first fails with [`XbaseError::Truncated`] carrying `context`.
pub fn read_exact_at(file: &File, buf: &mut [u8], offset: u64, context: &'static str) -> Result<()> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match file.read_at(&mut buf[filled..], offset + filled as u64) {
            Ok(0) => return Err(XbaseError::Truncated { context }),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Writes all of `buf` starting at `offset`, retrying short writes.
pub fn write_all_at(file: &File, buf: &[u8], offset: u64) -> Result<()> {
    file.write_all_at(buf, offset)?;
    Ok(())
}

/// Reads a little-endian `u32` field at `offset`.
pub fn read_u32_at(file: &File, offset: u64, context: &'static str) -> Result<u32> {
    let mut raw = [0u8; 4];
    read_exact_at(file, &mut raw, offset, context)?;
    Ok(u32::from_le_bytes(raw))
}

/// Writes a little-endian `u32` field at `offset`.
pub fn write_u32_at(file: &File, value: u32, offset: u64) -> Result<()> {
    write_all_at(file, &value.to_le_bytes(), offset)
}

/// Reads a little-endian `u16` field at `offset`.
pub fn read_u16_at(file: &File, offset: u64, context: &'static str) -> Result<u16> {
    let mut raw = [0u8; 2];
    read_exact_at(file, &mut raw, offset, context)?;
    Ok(u16::from_le_bytes(raw))
}

/// Returns the prefix of `bytes` up to, but not including, the first null.
pub fn null_terminated(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

/// Decodes a null-padded ASCII name field, trimming surrounding whitespace.
pub fn padded_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(null_terminated(bytes).trim_ascii()).into_owned()
}

/// Formats a DBT block number as the 10-byte right-justified ASCII column
/// stored in memo fields.
pub fn format_block_number(block: u32) -> [u8; 10] {
    let mut out = [b' '; 10];
    let digits = block.to_string();
    let start = 10 - digits.len();
    out[start..].copy_from_slice(digits.as_bytes());
    out
}

/// Parses the 10-byte memo column into a block number. A blank column is
/// block zero, meaning no memo chain is attached.
pub fn parse_block_number(column: &[u8]) -> Result<u32> {
    let text = String::from_utf8_lossy(column);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| XbaseError::corrupt(format!("bad memo block number column: {trimmed:?}")))
}

/// Decodes the 12-byte MDX packed-decimal numeric key.
///
/// Buffers shorter than 12 bytes decode to zero rather than failing; the
/// caller has already validated the tag's key length.
pub fn decode_packed_decimal(bytes: &[u8]) -> f64 {
    if bytes.len() < 12 {
        return 0.0;
    }

    let size = bytes[0];
    let sign = bytes[1];
    if sign == SIGN_ZERO {
        return 0.0;
    }

    let digits_left_of_decimal = i32::from(size) - 0x34;
    let negative = sign == SIGN_NEGATIVE_WITH_DECIMAL || sign == SIGN_NEGATIVE_WITHOUT_DECIMAL;

    let mut accumulated: i64 = 0;
    for &b in &bytes[2..11] {
        accumulated *= 100;
        if b == 0 {
            continue;
        }
        accumulated += i64::from((b & 0xf0) >> 4) * 10;
        accumulated += i64::from(b & 0x0f);
    }

    let mut value = accumulated as f64 / 10f64.powi(18 - digits_left_of_decimal);
    if negative {
        value = -value;
    }
    value
}
