//! Registry cell type definitions.
//!
//! Cells are the fundamental data structures within registry hives. Each
//! allocated cell opens with a 2-byte ASCII signature that selects which
//! variant (`nk`, `vk`, `sk`, `db`, or one of the four sub-key list shapes)
//! to dispatch to.

use crate::error::{RegistryError, Result};

/// Cell type signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    /// Key node (`nk`) — a registry key.
    KeyNode,
    /// Value key (`vk`) — a registry value.
    ValueKey,
    /// Key security (`sk`) — unimplemented, stubbed.
    Security,
    /// Index leaf (`li`) — list of subkey offsets.
    IndexLeaf,
    /// Fast leaf (`lf`) — list of subkeys with name hints.
    FastLeaf,
    /// Hash leaf (`lh`) — list of subkeys with name hashes.
    HashLeaf,
    /// Index root (`ri`) — list of subkey list offsets.
    IndexRoot,
    /// Big data (`db`) — value indirection for payloads over 16344 bytes.
    DataBlock,
}

impl CellType {
    /// Parses a cell type from a 2-byte signature.
    ///
    /// An unrecognized signature is a recoverable parse error
    /// (`RegistryError::BadSignature`), not a panic — the byte image this is
    /// dispatching over is untrusted input.
    pub fn from_signature(sig: &[u8; 2], offset: u32) -> Result<Self> {
        match sig {
            b"nk" => Ok(CellType::KeyNode),
            b"vk" => Ok(CellType::ValueKey),
            b"sk" => Ok(CellType::Security),
            b"li" => Ok(CellType::IndexLeaf),
            b"lf" => Ok(CellType::FastLeaf),
            b"lh" => Ok(CellType::HashLeaf),
            b"ri" => Ok(CellType::IndexRoot),
            b"db" => Ok(CellType::DataBlock),
            _ => Err(RegistryError::bad_signature(*sig, offset)),
        }
    }

    /// Returns the 2-byte signature for this cell type.
    pub fn signature(&self) -> &'static [u8; 2] {
        match self {
            CellType::KeyNode => b"nk",
            CellType::ValueKey => b"vk",
            CellType::Security => b"sk",
            CellType::IndexLeaf => b"li",
            CellType::FastLeaf => b"lf",
            CellType::HashLeaf => b"lh",
            CellType::IndexRoot => b"ri",
            CellType::DataBlock => b"db",
        }
    }

    /// Returns true if this cell type represents one of the four sub-key
    /// list shapes.
    pub fn is_subkey_list(&self) -> bool {
        matches!(
            self,
            CellType::IndexLeaf | CellType::FastLeaf | CellType::HashLeaf | CellType::IndexRoot
        )
    }
}

/// Flags for key nodes (the `nk` cell's flags word).
#[derive(Debug, Clone, Copy)]
pub struct KeyNodeFlags(pub u16);

impl KeyNodeFlags {
    /// Key is volatile (not stored on disk).
    pub const VOLATILE: u16 = 0x0001;
    /// Key is a mount point for another hive.
    pub const HIVE_EXIT: u16 = 0x0002;
    /// Key is the root of the hive (the cell `regf.root_cell_offset` points at).
    pub const HIVE_ENTRY: u16 = 0x0004;
    /// Key cannot be deleted.
    pub const NO_DELETE: u16 = 0x0008;
    /// Key is a symbolic link.
    pub const SYM_LINK: u16 = 0x0010;
    /// Key name is stored as single-byte ASCII rather than UTF-16LE.
    pub const COMP_NAME: u16 = 0x0020;
    /// Key is a predefined handle.
    pub const PREDEF_HANDLE: u16 = 0x0040;

    /// Wraps a raw flags word.
    pub fn new(flags: u16) -> Self {
        Self(flags)
    }

    /// Returns true if the specified flag bit is set.
    pub fn has_flag(&self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    /// Returns true if the key name is compressed (ASCII).
    pub fn is_compressed(&self) -> bool {
        self.has_flag(Self::COMP_NAME)
    }

    /// Returns true if this is a volatile key.
    pub fn is_volatile(&self) -> bool {
        self.has_flag(Self::VOLATILE)
    }

    /// Returns true if this is the hive's entry (root) key.
    pub fn is_hive_entry(&self) -> bool {
        self.has_flag(Self::HIVE_ENTRY)
    }
}

/// Value flags (the `vk` cell's flags word).
pub struct ValueFlags;

impl ValueFlags {
    /// Value name is stored as single-byte ASCII rather than UTF-16LE.
    pub const COMP_NAME: u16 = 0x0001;
}

/// Registry value data types (`REG_*` codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// `REG_NONE` — no type.
    None,
    /// `REG_SZ` — NUL-terminated string.
    String,
    /// `REG_EXPAND_SZ` — string with unexpanded environment references.
    ExpandString,
    /// `REG_BINARY` — opaque bytes.
    Binary,
    /// `REG_DWORD` — 32-bit little-endian integer.
    Dword,
    /// `REG_DWORD_BIG_ENDIAN` — 32-bit big-endian integer.
    DwordBigEndian,
    /// `REG_LINK` — symbolic link (opaque bytes at this layer).
    Link,
    /// `REG_MULTI_SZ` — NUL-separated list of strings.
    MultiString,
    /// `REG_RESOURCE_LIST`.
    ResourceList,
    /// `REG_FULL_RESOURCE_DESCRIPTOR`.
    FullResourceDescriptor,
    /// `REG_RESOURCE_REQUIREMENTS_LIST`.
    ResourceRequirementsList,
    /// `REG_QWORD` — 64-bit little-endian integer.
    Qword,
    /// A type code outside the 0–11 range this format defines.
    Unknown(u32),
}

impl ValueType {
    /// Parses a value type from its raw `u32` code. Every code is valid —
    /// codes outside 0–11 become `Unknown` rather than an error.
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => ValueType::None,
            1 => ValueType::String,
            2 => ValueType::ExpandString,
            3 => ValueType::Binary,
            4 => ValueType::Dword,
            5 => ValueType::DwordBigEndian,
            6 => ValueType::Link,
            7 => ValueType::MultiString,
            8 => ValueType::ResourceList,
            9 => ValueType::FullResourceDescriptor,
            10 => ValueType::ResourceRequirementsList,
            11 => ValueType::Qword,
            other => ValueType::Unknown(other),
        }
    }

    /// Returns the symbolic name of this type, e.g. `"REG_SZ"`, or
    /// `"UNKNOWN (0xHEX)"` for a code this format doesn't define.
    pub fn name(&self) -> String {
        match self {
            ValueType::None => "REG_NONE".to_string(),
            ValueType::String => "REG_SZ".to_string(),
            ValueType::ExpandString => "REG_EXPAND_SZ".to_string(),
            ValueType::Binary => "REG_BINARY".to_string(),
            ValueType::Dword => "REG_DWORD".to_string(),
            ValueType::DwordBigEndian => "REG_DWORD_BIG_ENDIAN".to_string(),
            ValueType::Link => "REG_LINK".to_string(),
            ValueType::MultiString => "REG_MULTI_SZ".to_string(),
            ValueType::ResourceList => "REG_RESOURCE_LIST".to_string(),
            ValueType::FullResourceDescriptor => "REG_FULL_RESOURCE_DESCRIPTOR".to_string(),
            ValueType::ResourceRequirementsList => "REG_RESOURCE_REQUIREMENTS_LIST".to_string(),
            ValueType::Qword => "REG_QWORD".to_string(),
            ValueType::Unknown(value) => format!("UNKNOWN ({:#x})", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_type_from_signature() {
        assert_eq!(CellType::from_signature(b"nk", 0).unwrap(), CellType::KeyNode);
        assert_eq!(CellType::from_signature(b"vk", 0).unwrap(), CellType::ValueKey);
        assert_eq!(CellType::from_signature(b"lf", 0).unwrap(), CellType::FastLeaf);
    }

    #[test]
    fn unknown_signature_is_bad_signature() {
        let err = CellType::from_signature(b"zz", 0x40).unwrap_err();
        assert!(matches!(err, RegistryError::BadSignature { .. }));
    }

    #[test]
    fn key_node_flags() {
        let flags = KeyNodeFlags::new(KeyNodeFlags::COMP_NAME | KeyNodeFlags::HIVE_ENTRY);
        assert!(flags.is_compressed());
        assert!(flags.is_hive_entry());
        assert!(!flags.is_volatile());
    }

    #[test]
    fn value_type_round_trip() {
        assert_eq!(ValueType::from_u32(1), ValueType::String);
        assert_eq!(ValueType::from_u32(4), ValueType::Dword);
        assert_eq!(ValueType::String.name(), "REG_SZ");
    }

    #[test]
    fn unknown_value_type_renders_hex() {
        assert_eq!(ValueType::from_u32(999).name(), "UNKNOWN (0x3e7)");
    }
}
