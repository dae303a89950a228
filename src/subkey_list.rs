//! Sub-key list parsing (`li`, `lf`, `lh`, `ri`).
//!
//! All four shapes share a 4-byte prefix (2-byte signature + 16-bit
//! `number_of_items`) followed by a fixed-stride payload. The payload is
//! walked through a [`CountBoundedSeq`], so a caller that only needs the
//! first few entries never pays to decode the rest.

use crate::error::{RegistryError, Result};
use crate::lazy::CountBoundedSeq;
use crate::utils::read_dword;

/// Sub-key list shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubkeyListType {
    /// `li` — plain offset list.
    IndexLeaf,
    /// `lf` — offset list with 4-byte name hints.
    FastLeaf,
    /// `lh` — offset list with 4-byte name hashes.
    HashLeaf,
    /// `ri` — offset list of other sub-key list cells.
    IndexRoot,
}

impl SubkeyListType {
    /// Parses a sub-key list type from its 2-byte signature.
    pub fn from_signature(sig: &[u8; 2], offset: u32) -> Result<Self> {
        match sig {
            b"li" => Ok(SubkeyListType::IndexLeaf),
            b"lf" => Ok(SubkeyListType::FastLeaf),
            b"lh" => Ok(SubkeyListType::HashLeaf),
            b"ri" => Ok(SubkeyListType::IndexRoot),
            _ => Err(RegistryError::bad_signature(*sig, offset)),
        }
    }

    /// Byte stride between successive entries: 4 for `li`/`ri`, 8 for `lf`/`lh`.
    pub fn stride(&self) -> usize {
        match self {
            SubkeyListType::IndexLeaf | SubkeyListType::IndexRoot => 4,
            SubkeyListType::FastLeaf | SubkeyListType::HashLeaf => 8,
        }
    }
}

/// One entry of an `lf`/`lh` list: a key-node offset plus its name hint/hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubkeyListEntry {
    /// Hive offset of the referenced key node.
    pub key_offset: u32,
    /// First 4 bytes of the name (`lf`) or a hash of it (`lh`) — unused by
    /// this crate beyond exposing it, since every lookup here is a full
    /// linear walk rather than a hinted binary search.
    pub name_hint: u32,
}

/// A parsed sub-key list header: its shape and item count, ready to drive a
/// [`CountBoundedSeq`] over the entries that follow byte 4 of `data`.
#[derive(Debug, Clone, Copy)]
pub struct SubkeyListHeader {
    pub list_type: SubkeyListType,
    pub count: usize,
}

impl SubkeyListHeader {
    /// Parses the 4-byte header common to all four sub-key list shapes.
    pub fn parse(data: &[u8], offset: u32) -> Result<Self> {
        if data.len() < 4 {
            return Err(RegistryError::out_of_bounds(offset, 4, data.len()));
        }
        let sig = [data[0], data[1]];
        let list_type = SubkeyListType::from_signature(&sig, offset)?;
        let count = u16::from_le_bytes([data[2], data[3]]) as usize;
        Ok(SubkeyListHeader { list_type, count })
    }
}

/// Builds a lazy sequence over a plain offset list (`li` or `ri`).
///
/// `data` is the full cell payload (signature onward); entries start at byte 4.
pub fn offset_seq<'a>(data: &'a [u8], offset: u32, header: SubkeyListHeader) -> CountBoundedSeq<'a, u32> {
    CountBoundedSeq::new(header.count, move |index| {
        let field_offset = 4 + index * 4;
        read_dword(data, offset, field_offset)
    })
}

/// Builds a lazy sequence over a hinted offset list (`lf` or `lh`).
pub fn hinted_seq<'a>(data: &'a [u8], offset: u32, header: SubkeyListHeader) -> CountBoundedSeq<'a, SubkeyListEntry> {
    CountBoundedSeq::new(header.count, move |index| {
        let field_offset = 4 + index * 8;
        let key_offset = read_dword(data, offset, field_offset)?;
        let name_hint = read_dword(data, offset, field_offset + 4)?;
        Ok(SubkeyListEntry { key_offset, name_hint })
    })
}
