//! The registry façade: opens a hive image and exposes it as a navigable
//! tree of [`Key`]s and [`Value`]s.

use crate::bigdata::{BigDataBlock, SEGMENT_SIZE};
use crate::error::{RegistryError, Result};
use crate::hbin::{self, CellInfo, HbinHeader};
use crate::header::{BaseBlock, BASE_BLOCK_SIZE};
use crate::key::KeyNode;
use crate::lazy::SizeBoundedSeq;
use crate::ordered_map::OrderedMap;
use crate::subkey_list::{self, SubkeyListHeader, SubkeyListType};
use crate::utils::{read_dword, HBIN_START_OFFSET};
use crate::value::{ValueData, ValueKey};

use memmap2::Mmap;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock, RwLock};
use tracing::{debug, instrument, warn};

/// Defensive cap on `ri` chain nesting depth; real hives never come close.
const MAX_RI_DEPTH: u32 = 32;

/// Backing storage for a hive's byte image.
enum HiveData {
    /// Memory-mapped file (used by [`Hive::open`]).
    Mapped(Mmap),
    /// Fully-read, refcounted owned buffer (used by [`Hive::from_file`]/[`Hive::from_bytes`]).
    Owned(Arc<Vec<u8>>),
}

impl HiveData {
    fn as_slice(&self) -> &[u8] {
        match self {
            HiveData::Mapped(mmap) => &mmap[..],
            HiveData::Owned(bytes) => &bytes[..],
        }
    }
}

/// An opened registry hive: a byte image plus its parsed base block.
///
/// All three construction paths converge on holding the full byte image in
/// memory — [`Hive::open`] memory-maps the file, while [`Hive::from_file`]
/// and [`Hive::from_bytes`] read it into an owned, refcounted buffer.
/// Parsing beyond the base block happens on demand as a caller traverses
/// keys and values; nothing is eagerly decoded at construction.
pub struct Hive {
    data: HiveData,
    base_block: BaseBlock,
    key_cache: RwLock<HashMap<u32, Arc<KeyNode>>>,
}

impl Hive {
    /// Opens a hive file via memory mapping.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        // Safety: the file is not expected to be concurrently truncated out
        // from under the mapping; the same trust assumption every mmap-based
        // reader in this ecosystem makes.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_data(HiveData::Mapped(mmap))
    }

    /// Opens a hive file by reading it fully into an owned buffer.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes)
    }

    /// Wraps an already-in-memory hive image.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_data(HiveData::Owned(Arc::new(bytes)))
    }

    fn from_data(data: HiveData) -> Result<Self> {
        let base_block = BaseBlock::parse(data.as_slice())?;
        Ok(Hive {
            data,
            base_block,
            key_cache: RwLock::new(HashMap::new()),
        })
    }

    /// The parsed `regf` base block.
    pub fn header(&self) -> &BaseBlock {
        &self.base_block
    }

    fn buffer(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// A lazy, size-bounded sequence of this hive's bins, starting at file
    /// offset 4096 and spanning `hive_bins_data_size` bytes.
    pub fn hbins(&self) -> SizeBoundedSeq<'_, HbinHeader> {
        let total = self.base_block.hive_bins_data_size;
        SizeBoundedSeq::new(total, move |position| {
            let file_offset = (HBIN_START_OFFSET + position) as usize;
            let buf = self.buffer();
            if file_offset + hbin::HBIN_HEADER_SIZE > buf.len() {
                return Err(RegistryError::out_of_bounds(
                    position,
                    hbin::HBIN_HEADER_SIZE,
                    buf.len().saturating_sub(file_offset),
                ));
            }
            let header = HbinHeader::parse(&buf[file_offset..], position)?;
            let size = header.size;
            Ok((header, size))
        })
    }

    /// Reads and parses the cell at the given hive offset.
    ///
    /// Every hive offset (a values-list, sub-key-list, or data-offset field)
    /// addresses into the same hive-bins region this reaches into directly —
    /// there's no need to first locate which bin the offset falls in.
    fn read_cell(&self, hive_offset: u32) -> Result<CellInfo> {
        let buf = self.buffer();
        let region_start = HBIN_START_OFFSET as usize;
        if region_start > buf.len() {
            return Err(RegistryError::out_of_bounds(hive_offset, 0, 0));
        }
        let (cell, _consumed) = hbin::parse_cell_at(&buf[region_start..], 0, hive_offset)?;
        Ok(cell)
    }

    fn key_node(&self, offset: u32) -> Result<Arc<KeyNode>> {
        if let Some(node) = self.key_cache.read().unwrap().get(&offset) {
            debug!(offset = format_args!("{:#x}", offset), "key node cache hit");
            return Ok(Arc::clone(node));
        }
        let cell = self.read_cell(offset)?;
        let node = Arc::new(KeyNode::parse(&cell.data, cell.offset)?);
        self.key_cache.write().unwrap().insert(offset, Arc::clone(&node));
        Ok(node)
    }

    fn key_at(&self, offset: u32, path: String) -> Result<Key<'_>> {
        let node = self.key_node(offset)?;
        Ok(Key {
            hive: self,
            offset,
            node,
            path,
            subkeys: OnceLock::new(),
            values: OnceLock::new(),
        })
    }

    /// The logical root key, at `regf.root_cell_offset`.
    #[instrument(skip(self))]
    pub fn root_key(&self) -> Result<Key<'_>> {
        self.key_at(self.base_block.root_cell_offset, String::new())
    }

    /// Descends the tree along a `\`-separated path (leading/trailing
    /// backslashes are stripped). Fails with `NotFound` on any missing segment.
    #[instrument(skip(self))]
    pub fn get(&self, path: &str) -> Result<Key<'_>> {
        let trimmed = path.trim_matches('\\');
        let root = self.root_key()?;
        if trimmed.is_empty() {
            return Ok(root);
        }

        let mut current = root;
        for segment in trimmed.split('\\') {
            let (child_offset, child_path) = {
                let subkeys = current.subkeys()?;
                let child = subkeys
                    .get_by_name(segment)
                    .map_err(|_| RegistryError::not_found("key", segment))?;
                (child.offset, current.child_path_prefix())
            };
            current = self.key_at(child_offset, child_path)?;
        }
        Ok(current)
    }

    /// Flattens a sub-key list cell into an ordered list of child key-node
    /// offsets, recursively resolving `ri` index-root indirection.
    #[instrument(skip(self))]
    fn flatten_subkey_list(&self, list_offset: u32, depth: u32) -> Result<Vec<u32>> {
        if depth > MAX_RI_DEPTH {
            return Err(RegistryError::RecursionLimitExceeded {
                offset: list_offset,
                limit: MAX_RI_DEPTH,
            });
        }

        let cell = self.read_cell(list_offset)?;
        let header = SubkeyListHeader::parse(&cell.data, cell.offset)?;

        match header.list_type {
            SubkeyListType::IndexLeaf => {
                let seq = subkey_list::offset_seq(&cell.data, cell.offset, header);
                seq.realize_all()
            }
            SubkeyListType::FastLeaf | SubkeyListType::HashLeaf => {
                let seq = subkey_list::hinted_seq(&cell.data, cell.offset, header);
                Ok(seq.realize_all()?.into_iter().map(|entry| entry.key_offset).collect())
            }
            SubkeyListType::IndexRoot => {
                let seq = subkey_list::offset_seq(&cell.data, cell.offset, header);
                let sublist_offsets = seq.realize_all()?;
                let mut flattened = Vec::new();
                for sub_offset in sublist_offsets {
                    flattened.extend(self.flatten_subkey_list(sub_offset, depth + 1)?);
                }
                Ok(flattened)
            }
        }
    }

    /// Resolves a value's raw payload and decodes it per its declared type.
    fn resolve_value_data(&self, vk: &ValueKey) -> Result<ValueData> {
        if vk.is_inline_data() {
            let raw = vk.inline_data();
            return ValueData::parse(&raw, vk.data_type, vk.offset);
        }

        let cell = self.read_cell(vk.data_offset)?;
        let data_size = vk.data_length() as usize;

        if cell.cell_type() == Some([b'd', b'b']) {
            let db = BigDataBlock::parse(&cell.data, cell.offset)?;
            let raw = self.read_big_data(&db, data_size)?;
            return ValueData::parse(&raw, vk.data_type, vk.offset);
        }

        let len = data_size.min(cell.data.len());
        ValueData::parse(&cell.data[..len], vk.data_type, vk.offset)
    }

    /// Reads and concatenates a big-data value's segments, truncating to `data_size`.
    fn read_big_data(&self, db: &BigDataBlock, data_size: usize) -> Result<Vec<u8>> {
        let segments_cell = self.read_cell(db.segment_list_offset)?;
        let mut result = Vec::with_capacity(data_size);

        for index in 0..db.segment_count as usize {
            if result.len() >= data_size {
                break;
            }
            let field_offset = index * 4;
            let segment_offset = read_dword(&segments_cell.data, segments_cell.offset, field_offset)?;
            let segment_cell = self.read_cell(segment_offset)?;
            let take = (data_size - result.len()).min(SEGMENT_SIZE).min(segment_cell.data.len());
            result.extend_from_slice(&segment_cell.data[..take]);
        }

        if result.len() < data_size {
            warn!(
                wanted = data_size,
                got = result.len(),
                "big-data segments produced less data than declared"
            );
        }
        result.truncate(data_size);
        Ok(result)
    }
}

/// A logical registry key: a named node with ordered, keyed sub-keys and values.
///
/// `subkeys()`/`values()` are computed once on first access and cached for
/// the lifetime of this `Key` — repeated calls never re-walk the sub-key
/// list or re-parse child cells.
pub struct Key<'a> {
    hive: &'a Hive,
    offset: u32,
    node: Arc<KeyNode>,
    path: String,
    subkeys: OnceLock<OrderedMap<Key<'a>>>,
    values: OnceLock<OrderedMap<Value<'a>>>,
}

impl<'a> Key<'a> {
    /// This key's hive offset.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// The key's decoded name (the root's is whatever its `nk` cell stores,
    /// e.g. `"ROOT"` — see [`Hive::get`] for how it's excluded from child paths).
    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// Last-written timestamp, rendered as a UTC string.
    pub fn last_written(&self) -> &str {
        &self.node.last_written
    }

    /// True if this key's flags mark it as the hive's entry (root) key.
    pub fn is_hive_entry(&self) -> bool {
        self.node.is_hive_entry()
    }

    /// Ordered, name-keyed view of this key's children.
    pub fn subkeys(&self) -> Result<&OrderedMap<Key<'a>>> {
        if let Some(map) = self.subkeys.get() {
            return Ok(map);
        }
        let built = self.build_subkeys()?;
        Ok(self.subkeys.get_or_init(|| built))
    }

    /// Ordered, name-keyed view of this key's values.
    pub fn values(&self) -> Result<&OrderedMap<Value<'a>>> {
        if let Some(map) = self.values.get() {
            return Ok(map);
        }
        let built = self.build_values()?;
        Ok(self.values.get_or_init(|| built))
    }

    fn build_subkeys(&self) -> Result<OrderedMap<Key<'a>>> {
        if !self.node.has_subkeys() {
            return Ok(OrderedMap::from_named(Vec::new()));
        }

        let offsets = self.hive.flatten_subkey_list(self.node.subkey_list_offset, 0)?;
        let child_path = self.child_path_prefix();

        let mut items = Vec::with_capacity(offsets.len());
        for offset in offsets {
            let child = self.hive.key_at(offset, child_path.clone())?;
            items.push((child.name().to_string(), child));
        }
        Ok(OrderedMap::from_named(items))
    }

    fn build_values(&self) -> Result<OrderedMap<Value<'a>>> {
        if !self.node.has_values() {
            return Ok(OrderedMap::from_named(Vec::new()));
        }

        let list_cell = self.hive.read_cell(self.node.value_list_offset)?;
        let mut items = Vec::with_capacity(self.node.value_count as usize);
        for index in 0..self.node.value_count as usize {
            let field_offset = index * 4;
            let value_offset = read_dword(&list_cell.data, list_cell.offset, field_offset)?;
            let value_cell = self.hive.read_cell(value_offset)?;
            let vk = ValueKey::parse(&value_cell.data, value_cell.offset)?;
            let name = vk.name.clone();
            items.push((name, Value { hive: self.hive, key: vk }));
        }
        Ok(OrderedMap::from_named(items))
    }

    /// Path prefix a child of this key should carry. The root's own name is
    /// excluded from composition — only the separator it contributes survives.
    fn child_path_prefix(&self) -> String {
        let own_name = if self.node.is_hive_entry() { "" } else { self.name() };
        format!("{}{}\\", self.path, own_name)
    }
}

impl<'a> fmt::Display for Key<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subkey_count = self.subkeys().map(|m| m.len()).unwrap_or(0);
        let value_count = self.values().map(|m| m.len()).unwrap_or(0);
        write!(f, "{}{}, {} values, {} subkeys", self.path, self.name(), value_count, subkey_count)
    }
}

/// A logical registry value: a named, typed datum attached to a key.
pub struct Value<'a> {
    hive: &'a Hive,
    key: ValueKey,
}

impl<'a> Value<'a> {
    /// The value's decoded name (`"(Default)"` when unnamed).
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// The `REG_*` type symbol, or `"UNKNOWN (0xHEX)"` for an undefined code.
    pub fn value_type(&self) -> String {
        self.key.data_type.name()
    }

    /// Decodes and returns this value's data, resolving indirection
    /// (dereferenced cell, or big-data segments) as needed.
    pub fn data(&self) -> Result<ValueData> {
        self.hive.resolve_value_data(&self.key)
    }
}

impl<'a> fmt::Display for Value<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data() {
            Ok(data) => write!(f, "{} ({}) = {}", self.name(), self.value_type(), data),
            Err(_) => write!(f, "{} ({})", self.name(), self.value_type()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HBIN_OFFSET: u32 = HBIN_START_OFFSET;

    fn nk_cell(
        name: &str,
        flags: u16,
        subkey_count: u32,
        subkey_list_offset: u32,
        value_count: u32,
        value_list_offset: u32,
    ) -> Vec<u8> {
        let mut payload = vec![0u8; 0x4C + name.len()];
        payload[0..2].copy_from_slice(b"nk");
        payload[2..4].copy_from_slice(&flags.to_le_bytes());
        payload[0x14..0x18].copy_from_slice(&subkey_count.to_le_bytes());
        payload[0x1C..0x20].copy_from_slice(&subkey_list_offset.to_le_bytes());
        payload[0x24..0x28].copy_from_slice(&value_count.to_le_bytes());
        payload[0x28..0x2C].copy_from_slice(&value_list_offset.to_le_bytes());
        payload[0x48..0x4A].copy_from_slice(&(name.len() as u16).to_le_bytes());
        payload[0x4C..0x4C + name.len()].copy_from_slice(name.as_bytes());
        payload
    }

    fn vk_cell(name: &str, data_size_raw: u32, data_offset: u32, data_type: u32) -> Vec<u8> {
        let mut payload = vec![0u8; 0x14 + name.len()];
        payload[0..2].copy_from_slice(b"vk");
        payload[2..4].copy_from_slice(&(name.len() as u16).to_le_bytes());
        payload[4..8].copy_from_slice(&data_size_raw.to_le_bytes());
        payload[8..12].copy_from_slice(&data_offset.to_le_bytes());
        payload[12..16].copy_from_slice(&data_type.to_le_bytes());
        payload[16..18].copy_from_slice(&0x0001u16.to_le_bytes());
        payload[0x14..0x14 + name.len()].copy_from_slice(name.as_bytes());
        payload
    }

    fn write_cell(buf: &mut Vec<u8>, hive_offset: u32, payload: &[u8]) {
        let file_offset = (HBIN_OFFSET + hive_offset) as usize;
        if buf.len() < file_offset + 4 + payload.len() {
            buf.resize(file_offset + 4 + payload.len(), 0);
        }
        let size = -((4 + payload.len()) as i32);
        buf[file_offset..file_offset + 4].copy_from_slice(&size.to_le_bytes());
        buf[file_offset + 4..file_offset + 4 + payload.len()].copy_from_slice(payload);
    }

    fn base_block(root_offset: u32, hive_bins_data_size: u32) -> Vec<u8> {
        let mut data = vec![0u8; BASE_BLOCK_SIZE];
        data[0..4].copy_from_slice(b"regf");
        data[20..24].copy_from_slice(&1u32.to_le_bytes());
        data[24..28].copy_from_slice(&5u32.to_le_bytes());
        data[36..40].copy_from_slice(&root_offset.to_le_bytes());
        data[40..44].copy_from_slice(&hive_bins_data_size.to_le_bytes());
        data[164..168].copy_from_slice(b"rmtm");
        data
    }

    fn empty_bin(buf: &mut Vec<u8>, size: u32) {
        buf.resize((HBIN_START_OFFSET + size) as usize, 0);
        let start = HBIN_START_OFFSET as usize;
        buf[start..start + 4].copy_from_slice(b"hbin");
        buf[start + 8..start + 12].copy_from_slice(&size.to_le_bytes());
    }

    #[test]
    fn s1_minimal_hive_root_display() {
        let mut buf = base_block(0x20, 4096);
        empty_bin(&mut buf, 4096);
        let root = nk_cell("ROOT", crate::cell::KeyNodeFlags::HIVE_ENTRY | crate::cell::KeyNodeFlags::COMP_NAME, 0, 0, 0, 0);
        write_cell(&mut buf, 0x20, &root);

        let hive = Hive::from_bytes(buf).unwrap();
        let root = hive.root_key().unwrap();
        assert_eq!(root.to_string(), "ROOT, 0 values, 0 subkeys");
        assert!(root.is_hive_entry());
    }

    #[test]
    fn s2_root_with_one_ascii_child() {
        let mut buf = base_block(0x20, 4096);
        empty_bin(&mut buf, 4096);

        let root = nk_cell("ROOT", crate::cell::KeyNodeFlags::HIVE_ENTRY | crate::cell::KeyNodeFlags::COMP_NAME, 1, 0x100, 0, 0);
        write_cell(&mut buf, 0x20, &root);

        let child = nk_cell("Foo", crate::cell::KeyNodeFlags::COMP_NAME, 0, 0, 0, 0);
        write_cell(&mut buf, 0x200, &child);

        let mut list = vec![0u8; 8];
        list[0..2].copy_from_slice(b"lh");
        list[2..4].copy_from_slice(&1u16.to_le_bytes());
        list[4..8].copy_from_slice(&0x200u32.to_le_bytes());
        write_cell(&mut buf, 0x100, &list);

        let hive = Hive::from_bytes(buf).unwrap();
        let root = hive.root_key().unwrap();
        let subkeys = root.subkeys().unwrap();
        assert_eq!(subkeys.get_by_name("Foo").unwrap().name(), "Foo");
        assert_eq!(subkeys.get_by_index(0).unwrap().name(), "Foo");
        assert_eq!(hive.get("\\Foo").unwrap().name(), "Foo");
        assert_eq!(hive.get("Foo").unwrap().name(), "Foo");
    }

    #[test]
    fn missing_path_segment_is_not_found() {
        let mut buf = base_block(0x20, 4096);
        empty_bin(&mut buf, 4096);
        let root = nk_cell("ROOT", crate::cell::KeyNodeFlags::HIVE_ENTRY | crate::cell::KeyNodeFlags::COMP_NAME, 0, 0, 0, 0);
        write_cell(&mut buf, 0x20, &root);

        let hive = Hive::from_bytes(buf).unwrap();
        assert!(hive.get("\\Nope").is_err());
    }

    #[test]
    fn inline_dword_value_round_trips() {
        let mut buf = base_block(0x20, 4096);
        empty_bin(&mut buf, 4096);

        let root = nk_cell("ROOT", crate::cell::KeyNodeFlags::HIVE_ENTRY | crate::cell::KeyNodeFlags::COMP_NAME, 0, 0, 1, 0x300);
        write_cell(&mut buf, 0x20, &root);

        let vk = vk_cell("Count", 4 | 0x8000_0000, 7, 4);
        write_cell(&mut buf, 0x400, &vk);

        let mut values_list = vec![0u8; 4];
        values_list[0..4].copy_from_slice(&0x400u32.to_le_bytes());
        write_cell(&mut buf, 0x300, &values_list);

        let hive = Hive::from_bytes(buf).unwrap();
        let root = hive.root_key().unwrap();
        let values = root.values().unwrap();
        let value = values.get_by_name("Count").unwrap();
        assert_eq!(value.value_type(), "REG_DWORD");
        assert_eq!(value.data().unwrap(), ValueData::Dword(7));
    }

    #[test]
    fn ri_chain_flattens_before_recursion_cap() {
        let mut buf = base_block(0x20, 8192);
        empty_bin(&mut buf, 8192);

        let root = nk_cell("ROOT", crate::cell::KeyNodeFlags::HIVE_ENTRY | crate::cell::KeyNodeFlags::COMP_NAME, 1, 0x100, 0, 0);
        write_cell(&mut buf, 0x20, &root);

        // ri -> li -> one key node.
        let mut ri = vec![0u8; 8];
        ri[0..2].copy_from_slice(b"ri");
        ri[2..4].copy_from_slice(&1u16.to_le_bytes());
        ri[4..8].copy_from_slice(&0x500u32.to_le_bytes());
        write_cell(&mut buf, 0x100, &ri);

        let mut li = vec![0u8; 8];
        li[0..2].copy_from_slice(b"li");
        li[2..4].copy_from_slice(&1u16.to_le_bytes());
        li[4..8].copy_from_slice(&0x600u32.to_le_bytes());
        write_cell(&mut buf, 0x500, &li);

        let child = nk_cell("Leaf", crate::cell::KeyNodeFlags::COMP_NAME, 0, 0, 0, 0);
        write_cell(&mut buf, 0x600, &child);

        let hive = Hive::from_bytes(buf).unwrap();
        let root = hive.root_key().unwrap();
        let subkeys = root.subkeys().unwrap();
        assert_eq!(subkeys.len(), 1);
        assert_eq!(subkeys.get_by_name("Leaf").unwrap().name(), "Leaf");
    }
}
