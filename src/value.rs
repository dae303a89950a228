//! Value (`vk` cell) parsing and value-data decoding.

use crate::cell::ValueType;
use crate::error::{RegistryError, Result};
use crate::utils::{read_dword, read_str, read_word, StrEncoding};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// The logical name used for a value whose `name_length` is zero.
pub const DEFAULT_VALUE_NAME: &str = "(Default)";

/// Bit of the raw `data_size` field that marks a value's data as stored
/// inline in the `data_offset` field rather than as a dereferenced cell.
const INLINE_DATA_BIT: u32 = 0x8000_0000;

/// Value key (`vk`) — a typed, named datum attached to a key.
#[derive(Debug, Clone)]
pub struct ValueKey {
    /// This cell's own hive offset.
    pub offset: u32,
    /// Length of the inline name, in bytes.
    pub name_length: u16,
    /// Raw `data_size` field, top bit intact — use [`ValueKey::is_inline_data`]
    /// and [`ValueKey::data_length`] rather than reading this directly.
    pub data_size_raw: u32,
    /// Either a dereferenceable hive offset, or (when inline) the 4 raw data bytes.
    pub data_offset: u32,
    /// Value data type.
    pub data_type: ValueType,
    /// Flags word (bit 0x0001 = name is ASCII).
    pub flags: u16,
    /// Decoded value name (`"(Default)"` when unnamed).
    pub name: String,
}

impl ValueKey {
    /// Parses a value key from its cell payload (the `"vk"` signature onward).
    pub fn parse(data: &[u8], offset: u32) -> Result<Self> {
        if data.len() < 0x14 {
            return Err(RegistryError::out_of_bounds(offset, 0x14, data.len()));
        }

        if &data[0..2] != b"vk" {
            return Err(RegistryError::bad_signature([data[0], data[1]], offset));
        }

        let name_length = read_word(data, offset, 0x02)?;
        let data_size_raw = read_dword(data, offset, 0x04)?;
        let data_offset = read_dword(data, offset, 0x08)?;
        let data_type = ValueType::from_u32(read_dword(data, offset, 0x0C)?);
        let flags = read_word(data, offset, 0x10)?;

        let name = if name_length > 0 {
            let encoding = if (flags & 0x0001) != 0 {
                StrEncoding::Ascii
            } else {
                StrEncoding::Utf16Le
            };
            read_str(data, offset, 0x14, name_length as usize, encoding)?
        } else {
            DEFAULT_VALUE_NAME.to_string()
        };

        Ok(ValueKey {
            offset,
            name_length,
            data_size_raw,
            data_offset,
            data_type,
            flags,
            name,
        })
    }

    /// True when the top bit of the raw `data_size` field is set — the
    /// payload is the 4 bytes of `data_offset` itself, not a dereference.
    ///
    /// This is the only correct test: a small *dereferenced* value (e.g. a
    /// 2-byte `REG_BINARY`) is not inline just because its length is small.
    pub fn is_inline_data(&self) -> bool {
        self.data_size_raw & INLINE_DATA_BIT != 0
    }

    /// Data length with the inline-marker bit masked off.
    pub fn data_length(&self) -> u32 {
        self.data_size_raw & !INLINE_DATA_BIT
    }

    /// Extracts the inline payload (valid only when [`ValueKey::is_inline_data`] is true).
    pub fn inline_data(&self) -> Vec<u8> {
        let bytes = self.data_offset.to_le_bytes();
        let len = (self.data_length() as usize).min(4);
        bytes[..len].to_vec()
    }
}

/// Decoded registry value data.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueData {
    /// `REG_NONE`, or an empty payload of any type.
    None,
    /// `REG_SZ`.
    String(String),
    /// `REG_EXPAND_SZ`.
    ExpandString(String),
    /// `REG_BINARY`, and the opaque-bytes types (`REG_LINK`, `REG_RESOURCE_*`).
    Binary(Vec<u8>),
    /// `REG_DWORD`.
    Dword(u32),
    /// `REG_DWORD_BIG_ENDIAN`.
    DwordBigEndian(u32),
    /// `REG_MULTI_SZ`.
    MultiString(Vec<String>),
    /// `REG_QWORD`.
    Qword(u64),
    /// A type code this format doesn't define; payload kept opaque.
    Unknown(Vec<u8>),
}

impl ValueData {
    /// Decodes `data` (the resolved raw payload, already stripped of any
    /// cell/segment framing) according to `value_type`.
    pub fn parse(data: &[u8], value_type: ValueType, offset: u32) -> Result<Self> {
        if data.is_empty() {
            return Ok(ValueData::None);
        }

        match value_type {
            ValueType::None => Ok(ValueData::None),

            ValueType::String => Ok(ValueData::String(decode_reg_sz(data))),
            ValueType::ExpandString => Ok(ValueData::ExpandString(decode_reg_sz(data))),

            ValueType::Dword => {
                if data.len() < 4 {
                    return Err(RegistryError::out_of_bounds(offset, 4, data.len()));
                }
                Ok(ValueData::Dword(Cursor::new(data).read_u32::<LittleEndian>()?))
            }

            ValueType::DwordBigEndian => {
                if data.len() < 4 {
                    return Err(RegistryError::out_of_bounds(offset, 4, data.len()));
                }
                Ok(ValueData::DwordBigEndian(Cursor::new(data).read_u32::<BigEndian>()?))
            }

            ValueType::Qword => {
                if data.len() < 8 {
                    return Err(RegistryError::out_of_bounds(offset, 8, data.len()));
                }
                Ok(ValueData::Qword(Cursor::new(data).read_u64::<LittleEndian>()?))
            }

            ValueType::MultiString => {
                // Raw decode (no trailing-NUL trim): each string's own NUL
                // terminator must survive into the split, or embedded empty
                // strings become indistinguishable from the list's own
                // terminator.
                let full = crate::utils::decode_str_raw(data, StrEncoding::Utf16Le)
                    .unwrap_or_else(|| crate::utils::DECODE_FAILURE_SENTINEL.to_string());
                let mut strings: Vec<String> = full.split('\0').map(|s| s.to_string()).collect();
                // The final NUL terminates the list itself (on top of each
                // string's own NUL terminator), producing one extra trailing
                // empty split that isn't a logical list entry. Any other
                // empty strings are kept as-is.
                if strings.len() > 1 && strings.last().map(String::is_empty).unwrap_or(false) {
                    strings.pop();
                }
                Ok(ValueData::MultiString(strings))
            }

            ValueType::Binary
            | ValueType::Link
            | ValueType::ResourceList
            | ValueType::FullResourceDescriptor
            | ValueType::ResourceRequirementsList => Ok(ValueData::Binary(data.to_vec())),

            ValueType::Unknown(_) => Ok(ValueData::Unknown(data.to_vec())),
        }
    }
}

/// Decodes a `REG_SZ`/`REG_EXPAND_SZ` payload: UTF-16LE, trailing NULs stripped.
fn decode_reg_sz(data: &[u8]) -> String {
    crate::utils::decode_str(data, StrEncoding::Utf16Le)
}

impl std::fmt::Display for ValueData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueData::None => write!(f, "(none)"),
            ValueData::String(s) | ValueData::ExpandString(s) => write!(f, "{}", s),
            ValueData::Binary(b) => write!(f, "{:02X?}", b),
            ValueData::Dword(d) => write!(f, "{} (0x{:08X})", d, d),
            ValueData::DwordBigEndian(d) => write!(f, "{} (0x{:08X})", d, d),
            ValueData::Qword(q) => write!(f, "{} (0x{:016X})", q, q),
            ValueData::MultiString(strings) => write!(f, "{}", strings.join(", ")),
            ValueData::Unknown(b) => write!(f, "{:02X?}", b),
        }
    }
}
