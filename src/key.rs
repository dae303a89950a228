//! Key node (`nk` cell) parsing.

use crate::cell::KeyNodeFlags;
use crate::error::{RegistryError, Result};
use crate::utils::{read_dword, read_filetime, read_str, read_word, StrEncoding};

/// Minimum size of a key node's fixed-layout prefix, before the variable-length name.
const KEY_NODE_MIN_SIZE: usize = 0x4C;

/// Offset of the inline name within the key node payload.
const KEY_NAME_OFFSET: usize = 0x4C;

/// Sentinel subkey/value count meaning "no children" (the other is `0`).
pub const EMPTY_COLLECTION_SENTINEL: u32 = 0xFFFF_FFFF;

/// Key node (`nk`) — a directory-like registry key entry.
#[derive(Debug, Clone)]
pub struct KeyNode {
    /// This cell's own hive offset.
    pub offset: u32,
    /// Flags word.
    pub flags: KeyNodeFlags,
    /// Last-written timestamp, rendered as a UTC string.
    pub last_written: String,
    /// Hive offset of the parent key node.
    pub parent_offset: u32,
    /// Number of (non-volatile) subkeys; `0` or `0xFFFFFFFF` means none.
    pub subkey_count: u32,
    /// Number of volatile subkeys.
    pub volatile_subkey_count: u32,
    /// Hive offset of the subkey list cell.
    pub subkey_list_offset: u32,
    /// Hive offset of the volatile subkey list cell.
    pub volatile_subkey_list_offset: u32,
    /// Number of values; `0` or `0xFFFFFFFF` means none.
    pub value_count: u32,
    /// Hive offset of the values list cell.
    pub value_list_offset: u32,
    /// Hive offset of the security descriptor cell (never dereferenced here).
    pub security_offset: u32,
    /// Hive offset of the class name cell.
    pub class_name_offset: u32,
    /// Largest subkey name length, in bytes.
    pub max_subkey_name_len: u32,
    /// Largest subkey class name length, in bytes.
    pub max_subkey_class_len: u32,
    /// Largest value name length, in bytes.
    pub max_value_name_len: u32,
    /// Largest value data length, in bytes.
    pub max_value_data_len: u32,
    /// Length of the inline name.
    pub name_length: u16,
    /// Length of the class name.
    pub class_name_length: u16,
    /// Decoded key name.
    pub name: String,
}

impl KeyNode {
    /// Parses a key node from its cell payload (the `"nk"` signature onward).
    pub fn parse(data: &[u8], offset: u32) -> Result<Self> {
        if data.len() < KEY_NODE_MIN_SIZE {
            return Err(RegistryError::out_of_bounds(offset, KEY_NODE_MIN_SIZE, data.len()));
        }

        if &data[0..2] != b"nk" {
            return Err(RegistryError::bad_signature([data[0], data[1]], offset));
        }

        let flags = KeyNodeFlags::new(read_word(data, offset, 0x02)?);
        let last_written = read_filetime(data, offset, 0x04)?;
        let parent_offset = read_dword(data, offset, 0x10)?;
        let subkey_count = read_dword(data, offset, 0x14)?;
        let volatile_subkey_count = read_dword(data, offset, 0x18)?;
        let subkey_list_offset = read_dword(data, offset, 0x1C)?;
        let volatile_subkey_list_offset = read_dword(data, offset, 0x20)?;
        let value_count = read_dword(data, offset, 0x24)?;
        let value_list_offset = read_dword(data, offset, 0x28)?;
        let security_offset = read_dword(data, offset, 0x2C)?;
        let class_name_offset = read_dword(data, offset, 0x30)?;
        let max_subkey_name_len = read_dword(data, offset, 0x34)?;
        let max_subkey_class_len = read_dword(data, offset, 0x38)?;
        let max_value_name_len = read_dword(data, offset, 0x3C)?;
        let max_value_data_len = read_dword(data, offset, 0x40)?;
        let name_length = read_word(data, offset, 0x48)?;
        let class_name_length = read_word(data, offset, 0x4A)?;

        let encoding = if flags.is_compressed() {
            StrEncoding::Ascii
        } else {
            StrEncoding::Utf16Le
        };
        let name = if name_length > 0 {
            read_str(data, offset, KEY_NAME_OFFSET, name_length as usize, encoding)?
        } else {
            String::new()
        };

        Ok(KeyNode {
            offset,
            flags,
            last_written,
            parent_offset,
            subkey_count,
            volatile_subkey_count,
            subkey_list_offset,
            volatile_subkey_list_offset,
            value_count,
            value_list_offset,
            security_offset,
            class_name_offset,
            max_subkey_name_len,
            max_subkey_class_len,
            max_value_name_len,
            max_value_data_len,
            name_length,
            class_name_length,
            name,
        })
    }

    /// True unless the subkey count is the empty-collection sentinel (`0` or `0xFFFFFFFF`).
    pub fn has_subkeys(&self) -> bool {
        self.subkey_count != 0 && self.subkey_count != EMPTY_COLLECTION_SENTINEL
    }

    /// True unless the value count is the empty-collection sentinel (`0` or `0xFFFFFFFF`).
    pub fn has_values(&self) -> bool {
        self.value_count != 0 && self.value_count != EMPTY_COLLECTION_SENTINEL
    }

    /// True if this key's flags mark it as the hive's entry (root) key.
    pub fn is_hive_entry(&self) -> bool {
        self.flags.is_hive_entry()
    }
}
