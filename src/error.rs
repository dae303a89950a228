//! Error types for registry hive parsing.
//!
//! The taxonomy mirrors what a caller actually needs to distinguish: a slice
//! request that ran off the end of the buffer, a cell whose signature isn't
//! in the known dispatch table, an attempt to materialize the unimplemented
//! security-descriptor cell, a failed name/path lookup, an out-of-range
//! positional index, and a navigation key of the wrong kind. Everything else
//! (corrupt structural fields, recursion blowups, I/O failures opening a
//! file) rides along as additional detail rather than replacing those six.

use std::io;
use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur while parsing or navigating a registry hive.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// I/O error occurred while reading the hive file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A requested slice exceeds the bounds of the hive buffer.
    #[error("out of bounds: offset {offset:#x} requested {requested} bytes, {available} available")]
    OutOfBounds {
        offset: u32,
        requested: usize,
        available: usize,
    },

    /// A cell signature is not in the known dispatch table.
    #[error("bad signature {found:?} at offset {offset:#x}")]
    BadSignature { found: [u8; 2], offset: u32 },

    /// Attempted to materialize a security descriptor (`sk`) cell.
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),

    /// A name or path lookup failed to resolve.
    #[error("not found: {0}")]
    NotFound(String),

    /// A positional index fell outside a realized collection.
    #[error("index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// A navigation key was neither an integer nor a string where either is accepted.
    #[error("type error: {0}")]
    TypeError(String),

    /// Hive is too small to hold a base block.
    #[error("hive too small: {size} bytes (minimum {minimum} bytes)")]
    HiveTooSmall { size: usize, minimum: usize },

    /// A structural field is inconsistent with the on-disk format.
    #[error("invalid hive format: {0}")]
    InvalidFormat(String),

    /// A cell declared an impossible size.
    #[error("invalid cell size {size} at offset {offset:#x}")]
    InvalidCellSize { size: i32, offset: u32 },

    /// A sub-key-list `ri` chain nested deeper than the defensive recursion cap.
    #[error("sub-key list recursion exceeded limit of {limit} at offset {offset:#x}")]
    RecursionLimitExceeded { offset: u32, limit: u32 },
}

impl RegistryError {
    /// Creates an out-of-bounds error with context.
    pub fn out_of_bounds(offset: u32, requested: usize, available: usize) -> Self {
        Self::OutOfBounds {
            offset,
            requested,
            available,
        }
    }

    /// Creates a bad-signature error with context.
    pub fn bad_signature(found: [u8; 2], offset: u32) -> Self {
        Self::BadSignature { found, offset }
    }

    /// Creates a not-found error with context about what was being searched.
    pub fn not_found(item_type: &str, name: &str) -> Self {
        Self::NotFound(format!("{} '{}'", item_type, name))
    }

    /// Creates an invalid cell size error with context.
    pub fn invalid_cell_size(size: i32, offset: u32) -> Self {
        Self::InvalidCellSize { size, offset }
    }

    /// Creates an index-out-of-range error with context.
    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }
}
