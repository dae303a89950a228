//! Registry hive base block (`regf` header) parsing.
//!
//! The base block is the first 4096 bytes of a registry hive file. It
//! carries the root cell offset, the size of the hive-bins region, and a
//! handful of recovery-related GUIDs that this crate surfaces but never
//! acts on (no transaction-log replay happens here).

use crate::error::{RegistryError, Result};
use crate::utils::{calculate_checksum, read_dword, read_filetime, read_guid, read_str, StrEncoding};
use std::fmt;
use tracing::warn;

/// Size of the base block in bytes.
pub const BASE_BLOCK_SIZE: usize = 4096;

/// Expected signature for a valid registry hive ("regf").
pub const REGF_SIGNATURE: &[u8; 4] = b"regf";

/// Expected signature of the `guid_signature` field ("rmtm").
pub const RMTM_SIGNATURE: &[u8; 4] = b"rmtm";

/// Registry hive base block header.
///
/// Represents the first 4 KiB of a hive file. `checksum`/`calculated_checksum`
/// are both exposed but a mismatch is not treated as a parse failure — the
/// format's own contract is that the checksum is informational.
#[derive(Debug, Clone)]
pub struct BaseBlock {
    /// Signature, should be "regf".
    pub signature: [u8; 4],
    /// Primary sequence number.
    pub sequence1: u32,
    /// Secondary sequence number.
    pub sequence2: u32,
    /// Last written timestamp, rendered as a UTC string.
    pub last_written: String,
    /// Major version of the hive format.
    pub major_version: u32,
    /// Minor version of the hive format.
    pub minor_version: u32,
    /// File type (0 = primary hive, 1 = log).
    pub file_type: u32,
    /// File format (1 = direct memory load).
    pub file_format: u32,
    /// Hive offset of the root key node.
    pub root_cell_offset: u32,
    /// Total size in bytes of the hive-bins region.
    pub hive_bins_data_size: u32,
    /// Clustering factor (always 1).
    pub clustering_factor: u32,
    /// Embedded file name (UTF-16LE, NUL-stripped).
    pub file_name: String,
    /// Recovery GUID `rmid`.
    pub rmid: String,
    /// Recovery GUID `logid`.
    pub logid: String,
    /// Flags.
    pub flags: u32,
    /// Recovery GUID `tmid`.
    pub tmid: String,
    /// Should read "rmtm" when set.
    pub guid_signature: [u8; 4],
    /// Timestamp of the last reorganization, rendered as a UTC string.
    pub last_reorganized: String,
    /// Checksum as stored on disk (XOR of the first 127 DWORDs).
    pub checksum: u32,
    /// Checksum recomputed from the buffer; compared only for diagnostics.
    pub calculated_checksum: u32,
    /// Thaw-transaction GUID.
    pub thawtmid: String,
    /// Thaw-resource-manager GUID.
    pub thawrmid: String,
    /// Thaw-log GUID (corrected offset 4072 — see module docs).
    pub thawlogid: String,
    /// Boot type.
    pub boot_type: u32,
    /// Boot recover flag.
    pub boot_recover: u32,
}

impl BaseBlock {
    /// Parses a base block from the first 4096 bytes of a hive file.
    ///
    /// The checksum is recomputed and compared, but a mismatch only produces
    /// a `warn!` log — this parser does not verify it.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < BASE_BLOCK_SIZE {
            return Err(RegistryError::HiveTooSmall {
                size: data.len(),
                minimum: BASE_BLOCK_SIZE,
            });
        }

        let mut signature = [0u8; 4];
        signature.copy_from_slice(&data[0..4]);
        if &signature != REGF_SIGNATURE {
            return Err(RegistryError::InvalidFormat(format!(
                "expected 'regf' signature, found {:?}",
                signature
            )));
        }

        let sequence1 = read_dword(data, 0, 4)?;
        let sequence2 = read_dword(data, 0, 8)?;
        let last_written = read_filetime(data, 0, 12)?;
        let major_version = read_dword(data, 0, 20)?;
        let minor_version = read_dword(data, 0, 24)?;
        let file_type = read_dword(data, 0, 28)?;
        let file_format = read_dword(data, 0, 32)?;
        let root_cell_offset = read_dword(data, 0, 36)?;
        let hive_bins_data_size = read_dword(data, 0, 40)?;
        let clustering_factor = read_dword(data, 0, 44)?;
        let file_name = read_str(data, 0, 48, 64, StrEncoding::Utf16Le)?;

        let rmid = read_guid(data, 0, 112)?;
        let logid = read_guid(data, 0, 128)?;
        let flags = read_dword(data, 0, 144)?;
        let tmid = read_guid(data, 0, 148)?;

        let mut guid_signature = [0u8; 4];
        guid_signature.copy_from_slice(&data[164..168]);

        let last_reorganized = read_filetime(data, 0, 168)?;
        let checksum = read_dword(data, 0, 508)?;
        let calculated_checksum = calculate_checksum(data);

        if checksum != calculated_checksum {
            warn!(
                stored = format_args!("{:#x}", checksum),
                calculated = format_args!("{:#x}", calculated_checksum),
                "base block checksum mismatch (not enforced)"
            );
        }

        let thawtmid = read_guid(data, 0, 4040)?;
        let thawrmid = read_guid(data, 0, 4056)?;
        let thawlogid = read_guid(data, 0, 4072)?;
        let boot_type = read_dword(data, 0, 4088)?;
        let boot_recover = read_dword(data, 0, 4092)?;

        Ok(BaseBlock {
            signature,
            sequence1,
            sequence2,
            last_written,
            major_version,
            minor_version,
            file_type,
            file_format,
            root_cell_offset,
            hive_bins_data_size,
            clustering_factor,
            file_name,
            rmid,
            logid,
            flags,
            tmid,
            guid_signature,
            last_reorganized,
            checksum,
            calculated_checksum,
            thawtmid,
            thawrmid,
            thawlogid,
            boot_type,
            boot_recover,
        })
    }

    /// Returns true if the hive is in a consistent state (sequence numbers match).
    pub fn is_consistent(&self) -> bool {
        self.sequence1 == self.sequence2
    }

    /// Returns true if `guid_signature` reads "rmtm" as expected.
    pub fn has_valid_guid_signature(&self) -> bool {
        &self.guid_signature == RMTM_SIGNATURE
    }
}

impl fmt::Display for BaseBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Registry Hive Header:\n\
             - Version: {}.{}\n\
             - Root Cell Offset: {:#x}\n\
             - Hive Bins Data Size: {} bytes\n\
             - Consistent: {}\n\
             - File Name: {}",
            self.major_version,
            self.minor_version,
            self.root_cell_offset,
            self.hive_bins_data_size,
            self.is_consistent(),
            self.file_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_base_block() -> Vec<u8> {
        let mut data = vec![0u8; BASE_BLOCK_SIZE];
        data[0..4].copy_from_slice(b"regf");
        data[20..24].copy_from_slice(&1u32.to_le_bytes());
        data[24..28].copy_from_slice(&5u32.to_le_bytes());
        data[36..40].copy_from_slice(&0x20u32.to_le_bytes());
        data[40..44].copy_from_slice(&4096u32.to_le_bytes());
        data[164..168].copy_from_slice(b"rmtm");
        let checksum = calculate_checksum(&data);
        data[508..512].copy_from_slice(&checksum.to_le_bytes());
        data
    }

    #[test]
    fn base_block_size() {
        assert_eq!(BASE_BLOCK_SIZE, 4096);
    }

    #[test]
    fn invalid_signature_is_rejected() {
        let mut data = vec![0u8; BASE_BLOCK_SIZE];
        data[0..4].copy_from_slice(b"XXXX");
        assert!(BaseBlock::parse(&data).is_err());
    }

    #[test]
    fn too_small_is_rejected() {
        let data = vec![0u8; 100];
        assert!(matches!(
            BaseBlock::parse(&data).unwrap_err(),
            RegistryError::HiveTooSmall { .. }
        ));
    }

    #[test]
    fn parses_minimal_header() {
        let data = minimal_base_block();
        let base = BaseBlock::parse(&data).unwrap();
        assert_eq!(base.root_cell_offset, 0x20);
        assert_eq!(base.hive_bins_data_size, 4096);
        assert!(base.has_valid_guid_signature());
        assert_eq!(base.checksum, base.calculated_checksum);
    }

    #[test]
    fn checksum_mismatch_does_not_fail_parse() {
        let mut data = minimal_base_block();
        data[508..512].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        let base = BaseBlock::parse(&data).unwrap();
        assert_ne!(base.checksum, base.calculated_checksum);
    }
}
