//! # regf-hive
//!
//! A read-only parser and navigator for Windows registry hive files (the
//! `regf` binary format backing `SYSTEM`, `SOFTWARE`, `SAM`, `NTUSER.DAT`,
//! and friends).
//!
//! ## Features
//!
//! - **Zero-copy where it counts**: the hive image is memory-mapped (or
//!   held as a single owned buffer); only individual cells are copied out.
//! - **Lazy evaluation**: hbins, cells, sub-key lists, and value lists are
//!   walked through a lazy-sequence abstraction, so traversing a narrow path
//!   never pays to decode siblings it doesn't visit.
//! - **Strong typing**: registry value data decodes into a typed
//!   [`ValueData`] enum rather than staying opaque bytes.
//! - **Detailed errors**: malformed input surfaces as a typed
//!   [`RegistryError`], never a panic.
//!
//! ## Architecture
//!
//! 1. **Base block** ([`header`]): the first 4096 bytes — root cell offset,
//!    hive-bins size, recovery GUIDs.
//! 2. **Hive bins** ([`hbin`]): 4 KiB-aligned blocks holding a contiguous run of cells.
//! 3. **Cells** ([`cell`]): the `nk`/`vk`/`sk`/`li`/`lf`/`lh`/`ri`/`db` dispatch taxonomy.
//! 4. **Key nodes** ([`key`]), **value keys** ([`value`]), **sub-key lists**
//!    ([`subkey_list`]), and **big-data blocks** ([`bigdata`]): the typed cell parsers.
//! 5. **[`hive`]**: the `Hive`/`Key`/`Value` façade tying all of the above
//!    into a navigable tree.
//!
//! ## Example
//!
//! ```no_run
//! use regf_hive::Hive;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let hive = Hive::open("SYSTEM")?;
//! let root = hive.root_key()?;
//! println!("{}", root);
//!
//! for subkey in root.subkeys()?.iter() {
//!     println!("  {}", subkey.name());
//! }
//!
//! if let Ok(values) = root.values() {
//!     for value in values.iter() {
//!         println!("  {} = {:?}", value.name(), value.data()?);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Non-goals
//!
//! This crate is read-only: it does not write hives, replay `.LOG1`/`.LOG2`
//! transaction logs, or decode `sk` security descriptors (attempting to
//! materialize one fails with [`RegistryError::Unimplemented`]).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bigdata;
pub mod cell;
pub mod error;
pub mod hbin;
pub mod header;
pub mod hive;
pub mod key;
pub mod lazy;
pub mod ordered_map;
pub mod security;
pub mod subkey_list;
pub mod utils;
pub mod value;

pub use cell::{CellType, KeyNodeFlags, ValueFlags, ValueType};
pub use error::{RegistryError, Result};
pub use hbin::{CellInfo, HbinHeader};
pub use header::BaseBlock;
pub use hive::{Hive, Key, Value};
pub use key::KeyNode;
pub use lazy::{CountBoundedSeq, CursorState, SizeBoundedSeq};
pub use ordered_map::OrderedMap;
pub use security::KeySecurity;
pub use subkey_list::{SubkeyListEntry, SubkeyListHeader, SubkeyListType};
pub use value::{ValueData, ValueKey};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
