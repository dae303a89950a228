//! Security descriptor (`sk`) cell — deliberately unparsed.
//!
//! The on-disk security descriptor is a self-relative `SECURITY_DESCRIPTOR`
//! plus a doubly-linked list of sibling `sk` cells sharing it. Decoding that
//! structure isn't needed for read-only navigation (`nk`/`vk` traversal never
//! dereferences `security_offset`), so this module exists only to give the
//! `sk` signature a named destination in the cell dispatch table and to fail
//! predictably if something ever tries to materialize one.

use crate::error::{RegistryError, Result};

/// A `sk` cell. Carries nothing — attempting to build one always fails.
#[derive(Debug, Clone, Copy)]
pub struct KeySecurity;

impl KeySecurity {
    /// Always fails with `RegistryError::Unimplemented`; `sk` cells are
    /// reachable only via `KeyNode::security_offset`, which this crate never
    /// dereferences during normal traversal.
    pub fn parse(_data: &[u8], _offset: u32) -> Result<Self> {
        Err(RegistryError::Unimplemented("security descriptor (sk) parsing"))
    }
}
