//! Insertion-ordered, name-keyed collection used for `Key::subkeys()` and
//! `Key::values()`.
//!
//! Mirrors `original_source/reg/registry.py`'s `RegistryKey.subkeys`/`.values`
//! properties: computed once, cached, and addressable both by position
//! (insertion order, matching the on-disk list walk) and by name (exact,
//! case-sensitive match).

use crate::error::{RegistryError, Result};
use std::collections::HashMap;

/// An ordered collection indexable by position or by name.
///
/// On a duplicate name (two sibling keys with the same name, which the
/// format does not forbid), the first occurrence wins the name lookup;
/// positional access still reaches every element.
#[derive(Debug, Clone)]
pub struct OrderedMap<V> {
    order: Vec<V>,
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl<V> OrderedMap<V> {
    /// Builds the map from an already-ordered `(name, value)` sequence.
    pub fn from_named(items: Vec<(String, V)>) -> Self {
        let mut order = Vec::with_capacity(items.len());
        let mut names = Vec::with_capacity(items.len());
        let mut index = HashMap::with_capacity(items.len());
        for (position, (name, value)) in items.into_iter().enumerate() {
            index.entry(name.clone()).or_insert(position);
            names.push(name);
            order.push(value);
        }
        Self { order, names, index }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Looks up an entry by insertion position.
    pub fn get_by_index(&self, index: usize) -> Result<&V> {
        self.order
            .get(index)
            .ok_or_else(|| RegistryError::index_out_of_range(index, self.order.len()))
    }

    /// Looks up an entry by exact, case-sensitive name.
    pub fn get_by_name(&self, name: &str) -> Result<&V> {
        let position = self
            .index
            .get(name)
            .ok_or_else(|| RegistryError::not_found("name", name))?;
        Ok(&self.order[*position])
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.order.iter()
    }

    /// Names in insertion order. Unlike [`OrderedMap::get_by_name`], this
    /// preserves every entry, including a later sibling that shares a name
    /// with an earlier one.
    pub fn names(&self) -> Vec<&str> {
        self.names.iter().map(String::as_str).collect()
    }
}
