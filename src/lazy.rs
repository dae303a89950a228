//! Generic lazy-sequence abstraction.
//!
//! Every list structure this crate walks — hive bins within a file, cells
//! within a bin, offset lists inside `li`/`lf`/`lh`/`ri` cells, a key's
//! values list — is some flavor of "keep loading the next element at the
//! current cursor until a stopping condition fires". This module factors
//! that pattern out once instead of hand-rolling it per cell type, mirroring
//! how `common.py`'s `LazyList` backs every list cell in the source this
//! crate was modeled on.
//!
//! Both flavors here present the same surface: `get(i)` loads just enough to
//! satisfy index `i` and caches it; `realize_all()` forces full materialization
//! (needed for `len()` and for iteration order checks). The cache is guarded
//! by a `RwLock` rather than requiring `&mut self`, so a `Key` built on top of
//! these sequences can be handed to multiple threads — consistent with the
//! internally-synchronized caching the rest of this crate uses (see
//! `Hive`'s key cache).

use crate::error::{RegistryError, Result};
use std::sync::RwLock;

/// Cursor state for a lazy sequence: a linear, advance-only machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No element has been loaded yet.
    Fresh,
    /// `n` elements have been loaded so far.
    Advanced(usize),
    /// The stopping condition fired; no more elements will ever be produced.
    Exhausted,
}

struct Inner<T> {
    state: CursorState,
    cache: Vec<T>,
    /// Loader-defined progress marker (byte offset for size-bounded, element
    /// index for count-bounded); opaque to everything outside `ensure_len`.
    position: u32,
}

/// A lazy sequence that keeps loading elements until a byte budget is spent.
///
/// Backs hbin enumeration (budget = `hive_bins_data_size`) and cell
/// enumeration within a single hbin (budget = the bin's payload size).
pub struct SizeBoundedSeq<'a, T> {
    max_size: u32,
    loader: Box<dyn Fn(u32) -> Result<(T, u32)> + 'a>,
    inner: RwLock<Inner<T>>,
}

impl<'a, T: Clone> SizeBoundedSeq<'a, T> {
    /// Creates a new size-bounded sequence. `loader(position)` must parse the
    /// element starting at byte `position` and return it along with the
    /// number of bytes it consumed (used to advance the cursor).
    pub fn new(max_size: u32, loader: impl Fn(u32) -> Result<(T, u32)> + 'a) -> Self {
        Self {
            max_size,
            loader: Box::new(loader),
            inner: RwLock::new(Inner {
                state: CursorState::Fresh,
                cache: Vec::new(),
                position: 0,
            }),
        }
    }

    fn ensure_len(&self, target_len: usize) -> Result<()> {
        let mut guard = self.inner.write().unwrap();
        while guard.cache.len() < target_len {
            if guard.state == CursorState::Exhausted || guard.position >= self.max_size {
                guard.state = CursorState::Exhausted;
                break;
            }
            let position = guard.position;
            let (element, consumed) = (self.loader)(position)?;
            guard.cache.push(element);
            guard.position = position.saturating_add(consumed.max(1));
            let n = guard.cache.len();
            guard.state = CursorState::Advanced(n);
        }
        Ok(())
    }

    /// Returns the element at `index`, loading as many preceding elements as
    /// needed (and no more).
    pub fn get(&self, index: usize) -> Result<T> {
        self.ensure_len(index + 1)?;
        let guard = self.inner.read().unwrap();
        guard
            .cache
            .get(index)
            .cloned()
            .ok_or_else(|| RegistryError::index_out_of_range(index, guard.cache.len()))
    }

    /// Forces full realization and returns every element in order.
    pub fn realize_all(&self) -> Result<Vec<T>> {
        loop {
            let exhausted = self.inner.read().unwrap().state == CursorState::Exhausted;
            if exhausted {
                break;
            }
            let next_len = self.inner.read().unwrap().cache.len() + 1;
            self.ensure_len(next_len)?;
        }
        Ok(self.inner.read().unwrap().cache.clone())
    }

    /// Number of elements, forcing full realization.
    pub fn len(&self) -> Result<usize> {
        Ok(self.realize_all()?.len())
    }

    /// Current cursor state, reflecting only what has been loaded so far.
    pub fn cursor_state(&self) -> CursorState {
        self.inner.read().unwrap().state
    }
}

/// A lazy sequence that loads exactly `max_items` elements.
///
/// Backs `li`/`ri` offset lists (stride 4), `lf`/`lh` offset+hint pair lists
/// (stride 8), and a key's values list (stride 4) — the stride itself lives
/// inside the loader closure, not in this struct, since it is purely a
/// byte-layout detail of the caller's cell.
pub struct CountBoundedSeq<'a, T> {
    max_items: usize,
    loader: Box<dyn Fn(usize) -> Result<T> + 'a>,
    inner: RwLock<Inner<T>>,
}

impl<'a, T: Clone> CountBoundedSeq<'a, T> {
    /// Creates a new count-bounded sequence. `loader(index)` must parse the
    /// `index`-th element directly (the loader is expected to compute its
    /// own byte offset from the stride it closes over).
    pub fn new(max_items: usize, loader: impl Fn(usize) -> Result<T> + 'a) -> Self {
        Self {
            max_items,
            loader: Box::new(loader),
            inner: RwLock::new(Inner {
                state: CursorState::Fresh,
                cache: Vec::new(),
                position: 0,
            }),
        }
    }

    fn ensure_len(&self, target_len: usize) -> Result<()> {
        let mut guard = self.inner.write().unwrap();
        while guard.cache.len() < target_len {
            if guard.state == CursorState::Exhausted || guard.cache.len() >= self.max_items {
                guard.state = CursorState::Exhausted;
                break;
            }
            let index = guard.cache.len();
            let element = (self.loader)(index)?;
            guard.cache.push(element);
            let n = guard.cache.len();
            guard.position = n as u32;
            guard.state = CursorState::Advanced(n);
        }
        Ok(())
    }

    /// Returns the element at `index`, loading as many preceding elements as
    /// needed (and no more).
    pub fn get(&self, index: usize) -> Result<T> {
        self.ensure_len(index + 1)?;
        let guard = self.inner.read().unwrap();
        guard
            .cache
            .get(index)
            .cloned()
            .ok_or_else(|| RegistryError::index_out_of_range(index, guard.cache.len()))
    }

    /// Forces full realization and returns every element in order.
    pub fn realize_all(&self) -> Result<Vec<T>> {
        self.ensure_len(self.max_items)?;
        Ok(self.inner.read().unwrap().cache.clone())
    }

    /// Number of elements (equal to `max_items` once realized).
    pub fn len(&self) -> usize {
        self.max_items
    }

    /// True when `max_items` is zero — callers use this to skip dereferencing
    /// a list offset entirely (the empty-collection sentinel, spec-mandated
    /// for `number_of_subkeys`/value count of 0 or `0xFFFFFFFF`).
    pub fn is_empty(&self) -> bool {
        self.max_items == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn size_bounded_stops_at_budget() {
        let seq = SizeBoundedSeq::new(10, |pos| Ok((pos, 4)));
        let all = seq.realize_all().unwrap();
        assert_eq!(all, vec![0, 4, 8]);
        assert_eq!(seq.cursor_state(), CursorState::Exhausted);
    }

    #[test]
    fn size_bounded_get_loads_lazily() {
        let calls = Cell::new(0);
        let seq = SizeBoundedSeq::new(100, |pos| {
            calls.set(calls.get() + 1);
            Ok((pos, 10))
        });
        assert_eq!(seq.get(2).unwrap(), 20);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn count_bounded_loads_exact_count() {
        let seq = CountBoundedSeq::new(3, |i| Ok(i * 2));
        let all = seq.realize_all().unwrap();
        assert_eq!(all, vec![0, 2, 4]);
        assert_eq!(seq.len(), 3);
    }

    #[test]
    fn count_bounded_empty_is_empty() {
        let seq: CountBoundedSeq<u32> = CountBoundedSeq::new(0, |_| Ok(0));
        assert!(seq.is_empty());
        assert_eq!(seq.realize_all().unwrap(), Vec::<u32>::new());
    }

    #[test]
    fn index_out_of_range_is_reported() {
        let seq = CountBoundedSeq::new(2, |i| Ok(i));
        assert!(seq.get(5).is_err());
    }
}
