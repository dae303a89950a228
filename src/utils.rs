//! Byte-level primitives shared by every cell parser.
//!
//! Every reader here takes `(buffer, base_offset, field_offset)`: `base_offset`
//! is the start of the record being decoded, `field_offset` is the field's
//! position within that record. Out-of-bounds reads fail with
//! [`RegistryError::OutOfBounds`]; nothing here ever panics. Malformed fixed-length
//! strings are the one case that degrades instead of failing — see
//! [`read_str`] — matching how the native editor tolerates bad name bytes.

use crate::error::{RegistryError, Result};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use encoding_rs::UTF_16LE;
use std::io::Cursor;

/// Offset where the hive-bins region starts, i.e. the size of the `regf` base block.
pub const HBIN_START_OFFSET: u32 = 0x1000;

/// Sentinel returned in place of a string that failed to decode under its declared encoding.
pub const DECODE_FAILURE_SENTINEL: &str = "...";

/// Text encoding used for a fixed-length name or string field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrEncoding {
    /// Single-byte ASCII, selected when a record's `COMP_NAME` flag is set.
    Ascii,
    /// UTF-16LE, the default when `COMP_NAME` is clear.
    Utf16Le,
}

fn slice_at<'a>(data: &'a [u8], base_offset: u32, field_offset: usize, len: usize) -> Result<&'a [u8]> {
    let start = field_offset;
    let end = start
        .checked_add(len)
        .ok_or_else(|| RegistryError::out_of_bounds(base_offset, len, data.len().saturating_sub(start)))?;
    if end > data.len() {
        return Err(RegistryError::out_of_bounds(
            base_offset,
            len,
            data.len().saturating_sub(start),
        ));
    }
    Ok(&data[start..end])
}

/// WORD — unsigned 16-bit little-endian.
pub fn read_word(data: &[u8], base_offset: u32, field_offset: usize) -> Result<u16> {
    let bytes = slice_at(data, base_offset, field_offset, 2)?;
    Ok(Cursor::new(bytes).read_u16::<LittleEndian>()?)
}

/// DWORD — unsigned 32-bit little-endian.
pub fn read_dword(data: &[u8], base_offset: u32, field_offset: usize) -> Result<u32> {
    let bytes = slice_at(data, base_offset, field_offset, 4)?;
    Ok(Cursor::new(bytes).read_u32::<LittleEndian>()?)
}

/// DWORD_BE — unsigned 32-bit big-endian.
pub fn read_dword_be(data: &[u8], base_offset: u32, field_offset: usize) -> Result<u32> {
    let bytes = slice_at(data, base_offset, field_offset, 4)?;
    Ok(Cursor::new(bytes).read_u32::<BigEndian>()?)
}

/// QWORD — unsigned 64-bit little-endian.
pub fn read_qword(data: &[u8], base_offset: u32, field_offset: usize) -> Result<u64> {
    let bytes = slice_at(data, base_offset, field_offset, 8)?;
    Ok(Cursor::new(bytes).read_u64::<LittleEndian>()?)
}

/// INT — signed 32-bit little-endian.
pub fn read_int(data: &[u8], base_offset: u32, field_offset: usize) -> Result<i32> {
    let bytes = slice_at(data, base_offset, field_offset, 4)?;
    Ok(Cursor::new(bytes).read_i32::<LittleEndian>()?)
}

/// BYTES(n) — raw opaque bytes.
pub fn read_bytes<'a>(data: &'a [u8], base_offset: u32, field_offset: usize, len: usize) -> Result<&'a [u8]> {
    slice_at(data, base_offset, field_offset, len)
}

/// FILETIME — 100ns ticks since 1601-01-01 UTC, rendered as a UTC timestamp string.
///
/// Ticks that don't map to a representable `chrono` timestamp degrade to the
/// same `"..."` sentinel used for unparsable strings, rather than failing.
pub fn read_filetime(data: &[u8], base_offset: u32, field_offset: usize) -> Result<String> {
    let ticks = read_qword(data, base_offset, field_offset)?;
    Ok(filetime_to_string(ticks))
}

/// Converts raw FILETIME ticks to a UTC timestamp string with microsecond precision.
pub fn filetime_to_string(ticks: u64) -> String {
    const FILETIME_UNIX_DIFF_SECS: i64 = 11_644_473_600;

    let seconds = (ticks / 10_000_000) as i64 - FILETIME_UNIX_DIFF_SECS;
    let micros = (ticks % 10_000_000) / 10;
    let nanos = (micros * 1_000) as u32;

    match chrono::DateTime::<chrono::Utc>::from_timestamp(seconds, nanos) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.6f UTC").to_string(),
        None => DECODE_FAILURE_SENTINEL.to_string(),
    }
}

/// GUID — standard mixed-endian rendering, `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
pub fn read_guid(data: &[u8], base_offset: u32, field_offset: usize) -> Result<String> {
    let bytes = slice_at(data, base_offset, field_offset, 16)?;
    Ok(format_guid(bytes))
}

/// Formats 16 raw GUID bytes (as stored on disk, little-endian first three fields).
pub fn format_guid(bytes: &[u8]) -> String {
    debug_assert_eq!(bytes.len(), 16);
    let data1 = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let data2 = u16::from_le_bytes([bytes[4], bytes[5]]);
    let data3 = u16::from_le_bytes([bytes[6], bytes[7]]);
    format!(
        "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        data1,
        data2,
        data3,
        bytes[8],
        bytes[9],
        bytes[10],
        bytes[11],
        bytes[12],
        bytes[13],
        bytes[14],
        bytes[15]
    )
}

/// STR(n, encoding) — fixed-length string, trailing NULs stripped.
///
/// Decode failure (odd-length UTF-16LE, or bytes that don't map to either
/// encoding cleanly) yields [`DECODE_FAILURE_SENTINEL`] instead of an error —
/// an out-of-bounds slice request still fails, since that's a distinct
/// concern from a malformed-but-present string.
pub fn read_str(data: &[u8], base_offset: u32, field_offset: usize, len: usize, encoding: StrEncoding) -> Result<String> {
    let bytes = slice_at(data, base_offset, field_offset, len)?;
    Ok(decode_str(bytes, encoding))
}

/// Decodes an already-sliced byte run under the given encoding, degrading to
/// [`DECODE_FAILURE_SENTINEL`] on failure rather than erroring. Trailing NULs
/// are stripped — this is the STR(n, encoding) field semantics. Callers that
/// need the untrimmed decode (e.g. a `REG_MULTI_SZ` payload, where an
/// embedded NUL is a meaningful list separator) should use
/// [`decode_str_raw`] instead.
pub fn decode_str(bytes: &[u8], encoding: StrEncoding) -> String {
    decode_str_raw(bytes, encoding)
        .map(|s| s.trim_end_matches('\0').to_string())
        .unwrap_or_else(|| DECODE_FAILURE_SENTINEL.to_string())
}

/// Decodes an already-sliced byte run under the given encoding without
/// stripping trailing NULs, returning `None` on decode failure rather than
/// degrading to the sentinel string — the caller decides what a failed
/// decode means in its own context.
pub fn decode_str_raw(bytes: &[u8], encoding: StrEncoding) -> Option<String> {
    match encoding {
        StrEncoding::Ascii => {
            if bytes.iter().any(|&b| b >= 0x80) {
                return None;
            }
            Some(String::from_utf8_lossy(bytes).to_string())
        }
        StrEncoding::Utf16Le => {
            if bytes.len() % 2 != 0 {
                return None;
            }
            let (decoded, _encoding, had_errors) = UTF_16LE.decode(bytes);
            if had_errors {
                return None;
            }
            Some(decoded.to_string())
        }
    }
}

/// Calculates the XOR checksum over the first 508 bytes (127 DWORDs) of the base block.
pub fn calculate_checksum(data: &[u8]) -> u32 {
    let mut checksum: u32 = 0;
    for i in (0..0x1FC).step_by(4) {
        if i + 4 <= data.len() {
            if let Ok(dword) = read_dword(data, 0, i) {
                checksum ^= dword;
            }
        }
    }
    checksum
}

/// Converts a hive offset (relative to the first hbin) to an absolute file offset.
#[inline]
pub fn cell_offset_to_absolute(cell_offset: u32) -> Result<u32> {
    cell_offset
        .checked_add(HBIN_START_OFFSET)
        .ok_or_else(|| RegistryError::out_of_bounds(cell_offset, 0, 0))
}

/// Converts an absolute file offset to a hive offset (relative to the first hbin).
#[inline]
pub fn absolute_to_cell_offset(absolute_offset: u32) -> Result<u32> {
    if absolute_offset < HBIN_START_OFFSET {
        return Err(RegistryError::InvalidFormat(format!(
            "absolute offset {:#x} is before hbin start",
            absolute_offset
        )));
    }
    Ok(absolute_offset - HBIN_START_OFFSET)
}
