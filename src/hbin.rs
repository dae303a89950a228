//! Hive bin (`hbin`) header parsing and cell enumeration.
//!
//! Hive bins are 4 KiB-aligned blocks that hold a contiguous run of cells.
//! Each bin opens with a 32-byte header, after which cells fill exactly the
//! remainder of the bin's declared size.

use crate::error::{RegistryError, Result};
use crate::lazy::SizeBoundedSeq;
use crate::utils::read_dword;

/// Expected signature for hive bins ("hbin").
pub const HBIN_SIGNATURE: &[u8; 4] = b"hbin";

/// Size of an hbin header in bytes.
pub const HBIN_HEADER_SIZE: usize = 0x20;

/// Hive bin header.
#[derive(Debug, Clone)]
pub struct HbinHeader {
    /// Signature, should be "hbin".
    pub signature: [u8; 4],
    /// This bin's own hive offset.
    pub offset: u32,
    /// Size of this bin in bytes, including the header.
    pub size: u32,
    /// Reserved fields.
    pub reserved: [u32; 2],
    /// Timestamp (raw FILETIME ticks; only the first bin's is meaningful in practice).
    pub timestamp: u64,
    /// Spare field.
    pub spare: u32,
}

impl HbinHeader {
    /// Parses an hbin header from bytes starting at the header itself.
    pub fn parse(data: &[u8], expected_offset: u32) -> Result<Self> {
        if data.len() < HBIN_HEADER_SIZE {
            return Err(RegistryError::out_of_bounds(expected_offset, HBIN_HEADER_SIZE, data.len()));
        }

        let mut signature = [0u8; 4];
        signature.copy_from_slice(&data[0..4]);
        if &signature != HBIN_SIGNATURE {
            return Err(RegistryError::InvalidFormat(format!(
                "expected 'hbin' signature at hive offset {:#x}, found {:?}",
                expected_offset, signature
            )));
        }

        let offset = read_dword(data, expected_offset, 0x04)?;
        if offset != expected_offset {
            return Err(RegistryError::InvalidFormat(format!(
                "hbin offset mismatch: expected {:#x}, found {:#x}",
                expected_offset, offset
            )));
        }

        let size = read_dword(data, expected_offset, 0x08)?;
        let reserved = [
            read_dword(data, expected_offset, 0x0C)?,
            read_dword(data, expected_offset, 0x10)?,
        ];
        let timestamp = u64::from(read_dword(data, expected_offset, 0x14)?)
            | (u64::from(read_dword(data, expected_offset, 0x18)?) << 32);
        let spare = read_dword(data, expected_offset, 0x1C)?;

        Ok(HbinHeader {
            signature,
            offset,
            size,
            reserved,
            timestamp,
            spare,
        })
    }

    /// Size of the payload area, i.e. the bin's size minus its header.
    pub fn data_size(&self) -> u32 {
        self.size.saturating_sub(HBIN_HEADER_SIZE as u32)
    }

    /// A lazy, size-bounded sequence over this bin's cells, advancing by each
    /// cell's own absolute size until `data_size()` bytes are spent.
    ///
    /// `bin_payload` must start at the first byte after this header (i.e. the
    /// bin's payload region), and be at least `data_size()` bytes long.
    pub fn cells<'a>(&self, bin_payload: &'a [u8]) -> SizeBoundedSeq<'a, CellInfo> {
        let hbin_offset = self.offset + HBIN_HEADER_SIZE as u32;
        let max_size = self.data_size();
        SizeBoundedSeq::new(max_size, move |position| parse_cell_at(bin_payload, hbin_offset, position))
    }
}

/// Information about one cell within an hbin's payload.
#[derive(Debug, Clone)]
pub struct CellInfo {
    /// Hive offset of this cell (its size-prefix byte).
    pub offset: u32,
    /// Absolute size of the cell, including its 4-byte size prefix.
    pub size: u32,
    /// True when the cell is allocated (size was stored negative).
    pub is_allocated: bool,
    /// Cell payload, i.e. everything after the size prefix and before the
    /// next cell. Bytes 0–1 of this slice are the 2-byte type signature.
    pub data: Vec<u8>,
}

impl CellInfo {
    /// Returns the cell type signature (first 2 bytes of the payload), if present.
    pub fn cell_type(&self) -> Option<[u8; 2]> {
        if self.data.len() >= 2 {
            Some([self.data[0], self.data[1]])
        } else {
            None
        }
    }
}

/// Parses one cell starting at `bin_payload[position..]`, returning the cell
/// and its absolute size (the advance amount for the caller's cursor).
///
/// `hbin_offset` is the hive offset of the bin's payload start (i.e. the
/// bin's own offset plus its 32-byte header), used to compute each cell's
/// absolute hive offset for error reporting.
pub fn parse_cell_at(bin_payload: &[u8], hbin_offset: u32, position: u32) -> Result<(CellInfo, u32)> {
    let pos = position as usize;
    let cell_offset = hbin_offset + position;

    let raw_size = read_dword(bin_payload, cell_offset, pos)? as i32;
    if raw_size == 0 {
        return Err(RegistryError::invalid_cell_size(raw_size, cell_offset));
    }

    let abs_size = raw_size.unsigned_abs();
    if abs_size < 4 {
        return Err(RegistryError::invalid_cell_size(raw_size, cell_offset));
    }

    let data_start = pos + 4;
    let data_end = pos + abs_size as usize;
    if data_end > bin_payload.len() {
        return Err(RegistryError::out_of_bounds(cell_offset, abs_size as usize, bin_payload.len() - pos));
    }

    let cell_info = CellInfo {
        offset: cell_offset,
        size: abs_size,
        is_allocated: raw_size < 0,
        data: bin_payload[data_start..data_end].to_vec(),
    };

    Ok((cell_info, abs_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hbin_header_size_is_32() {
        assert_eq!(HBIN_HEADER_SIZE, 32);
    }

    #[test]
    fn invalid_hbin_signature_is_rejected() {
        let mut data = vec![0u8; HBIN_HEADER_SIZE];
        data[0..4].copy_from_slice(b"XXXX");
        assert!(HbinHeader::parse(&data, 0).is_err());
    }

    #[test]
    fn parses_one_allocated_cell() {
        let mut payload = vec![0u8; 16];
        payload[0..4].copy_from_slice(&(-16i32).to_le_bytes());
        payload[4..6].copy_from_slice(b"nk");
        let (cell, consumed) = parse_cell_at(&payload, 0, 0).unwrap();
        assert_eq!(consumed, 16);
        assert!(cell.is_allocated);
        assert_eq!(cell.cell_type(), Some([b'n', b'k']));
    }

    #[test]
    fn truncated_cell_is_out_of_bounds() {
        let mut payload = vec![0u8; 8];
        payload[0..4].copy_from_slice(&(-32i32).to_le_bytes());
        assert!(parse_cell_at(&payload, 0, 0).is_err());
    }

    #[test]
    fn cells_sequence_sums_to_bin_data_size() {
        // A 64-byte bin: 32-byte header, then two 16-byte cells filling the rest.
        let mut header_bytes = vec![0u8; HBIN_HEADER_SIZE];
        header_bytes[0..4].copy_from_slice(HBIN_SIGNATURE);
        header_bytes[8..12].copy_from_slice(&64u32.to_le_bytes());
        let header = HbinHeader::parse(&header_bytes, 0).unwrap();

        let mut payload = vec![0u8; 32];
        payload[0..4].copy_from_slice(&(-16i32).to_le_bytes());
        payload[4..6].copy_from_slice(b"nk");
        payload[16..20].copy_from_slice(&(-16i32).to_le_bytes());
        payload[20..22].copy_from_slice(b"vk");

        let cells = header.cells(&payload).realize_all().unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].cell_type(), Some([b'n', b'k']));
        assert_eq!(cells[1].cell_type(), Some([b'v', b'k']));

        let total: u32 = cells.iter().map(|c| c.size).sum();
        assert_eq!(total, header.data_size());
        assert_eq!(header.data_size(), header.size - HBIN_HEADER_SIZE as u32);
    }

    #[test]
    fn cells_sequence_stops_on_free_cell_at_budget_edge() {
        // One allocated cell plus one free (positive size) cell, together
        // exactly spanning the bin's payload.
        let mut header_bytes = vec![0u8; HBIN_HEADER_SIZE];
        header_bytes[0..4].copy_from_slice(HBIN_SIGNATURE);
        header_bytes[8..12].copy_from_slice(&48u32.to_le_bytes());
        let header = HbinHeader::parse(&header_bytes, 0).unwrap();

        let mut payload = vec![0u8; 16];
        payload[0..4].copy_from_slice(&(-8i32).to_le_bytes());
        payload[4..6].copy_from_slice(b"vk");
        payload[8..12].copy_from_slice(&8i32.to_le_bytes());

        let cells = header.cells(&payload).realize_all().unwrap();
        assert_eq!(cells.len(), 2);
        assert!(cells[0].is_allocated);
        assert!(!cells[1].is_allocated);
        let total: u32 = cells.iter().map(|c| c.size).sum();
        assert_eq!(total, header.data_size());
    }
}
