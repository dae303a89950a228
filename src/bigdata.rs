//! Big-data (`db`) cell parsing.
//!
//! Values whose data exceeds 16344 bytes are not stored inline or in a
//! single dereferenced cell; instead a `db` cell points at a segments list,
//! each entry of which is itself a cell holding up to 16344 bytes of the
//! value's payload.

use crate::error::{RegistryError, Result};
use crate::utils::read_word;

/// Maximum payload bytes contributed by a single segment cell.
pub const SEGMENT_SIZE: usize = 16344;

/// Minimum size of a `db` cell's fixed prefix.
const MIN_SIZE: usize = 8;

/// Big-data block header (`db` cell).
#[derive(Debug, Clone)]
pub struct BigDataBlock {
    /// Number of data segments.
    pub segment_count: u16,
    /// Hive offset of the segments list cell.
    pub segment_list_offset: u32,
}

impl BigDataBlock {
    /// Parses a `db` cell's payload (the `"db"` signature onward).
    pub fn parse(data: &[u8], offset: u32) -> Result<Self> {
        if data.len() < MIN_SIZE {
            return Err(RegistryError::out_of_bounds(offset, MIN_SIZE, data.len()));
        }

        if &data[0..2] != b"db" {
            return Err(RegistryError::bad_signature([data[0], data[1]], offset));
        }

        let segment_count = read_word(data, offset, 0x02)?;
        let segment_list_offset = u32::from_le_bytes([data[0x04], data[0x05], data[0x06], data[0x07]]);

        Ok(BigDataBlock {
            segment_count,
            segment_list_offset,
        })
    }
}
