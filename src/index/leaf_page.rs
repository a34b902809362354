use std::marker::PhantomData;

use crate::common::{PageId, INVALID_PAGE_ID, PAGE_SIZE};

use super::index_key::{IndexKey, IndexValue};
use super::tree_page::{self, TreePageType, TREE_PAGE_HEADER_SIZE};

// Leaves extend the shared header with the id of the next leaf in key order
const NEXT_PAGE_ID_OFFSET: usize = TREE_PAGE_HEADER_SIZE;
const LEAF_HEADER_SIZE: usize = TREE_PAGE_HEADER_SIZE + 4;

fn stride<K: IndexKey, V: IndexValue>() -> usize {
    K::ENCODED_LEN + V::ENCODED_LEN
}

fn entry_offset<K: IndexKey, V: IndexValue>(index: usize) -> usize {
    LEAF_HEADER_SIZE + index * stride::<K, V>()
}

fn key_at<K: IndexKey, V: IndexValue>(data: &[u8], index: usize) -> K {
    let off = entry_offset::<K, V>(index);
    K::decode_from(&data[off..off + K::ENCODED_LEN])
}

fn value_at<K: IndexKey, V: IndexValue>(data: &[u8], index: usize) -> V {
    let off = entry_offset::<K, V>(index) + K::ENCODED_LEN;
    V::decode_from(&data[off..off + V::ENCODED_LEN])
}

/// First slot whose key is >= `key`; `size` when every key is smaller.
fn lower_bound<K: IndexKey, V: IndexValue>(data: &[u8], key: &K) -> usize {
    let mut lo = 0;
    let mut hi = tree_page::size(data);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if key_at::<K, V>(data, mid) < *key {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

fn next_page_id(data: &[u8]) -> PageId {
    PageId::new(u32::from_le_bytes(
        data[NEXT_PAGE_ID_OFFSET..NEXT_PAGE_ID_OFFSET + 4]
            .try_into()
            .unwrap(),
    ))
}

/// Read-only view of a leaf page: sorted `(key, value)` slots plus the leaf
/// chain link.
pub struct LeafPageRef<'a, K, V> {
    data: &'a [u8],
    _marker: PhantomData<(K, V)>,
}

impl<'a, K: IndexKey, V: IndexValue> LeafPageRef<'a, K, V> {
    pub fn new(data: &'a [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        debug_assert!(tree_page::is_leaf(data));
        Self {
            data,
            _marker: PhantomData,
        }
    }

    pub fn size(&self) -> usize {
        tree_page::size(self.data)
    }

    pub fn max_size(&self) -> usize {
        tree_page::max_size(self.data)
    }

    pub fn min_size(&self) -> usize {
        tree_page::min_size(self.data)
    }

    pub fn page_id(&self) -> PageId {
        tree_page::page_id(self.data)
    }

    pub fn parent_page_id(&self) -> PageId {
        tree_page::parent_page_id(self.data)
    }

    pub fn next_page_id(&self) -> PageId {
        next_page_id(self.data)
    }

    pub fn key_at(&self, index: usize) -> K {
        debug_assert!(index < self.size());
        key_at::<K, V>(self.data, index)
    }

    pub fn value_at(&self, index: usize) -> V {
        debug_assert!(index < self.size());
        value_at::<K, V>(self.data, index)
    }

    pub fn entry_at(&self, index: usize) -> (K, V) {
        (self.key_at(index), self.value_at(index))
    }

    /// First slot whose key is >= `key`.
    pub fn lower_bound(&self, key: &K) -> usize {
        lower_bound::<K, V>(self.data, key)
    }

    pub fn lookup(&self, key: &K) -> Option<V> {
        let pos = self.lower_bound(key);
        if pos < self.size() && self.key_at(pos) == *key {
            Some(self.value_at(pos))
        } else {
            None
        }
    }

    pub fn entries(&self) -> Vec<(K, V)> {
        (0..self.size()).map(|i| self.entry_at(i)).collect()
    }
}

/// Mutable view of a leaf page.
pub struct LeafPage<'a, K, V> {
    data: &'a mut [u8],
    _marker: PhantomData<(K, V)>,
}

impl<'a, K: IndexKey, V: IndexValue> LeafPage<'a, K, V> {
    pub fn new(data: &'a mut [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        debug_assert!(tree_page::is_leaf(data));
        Self {
            data,
            _marker: PhantomData,
        }
    }

    /// Formats a raw page as an empty leaf.
    pub fn init(data: &'a mut [u8], page_id: PageId, parent: PageId, max_size: usize) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        assert!(max_size >= 2 && max_size <= Self::capacity());
        data.fill(0);
        tree_page::set_page_type(data, TreePageType::Leaf);
        tree_page::set_size(data, 0);
        tree_page::set_max_size(data, max_size);
        tree_page::set_page_id(data, page_id);
        tree_page::set_parent_page_id(data, parent);
        let mut page = Self {
            data,
            _marker: PhantomData,
        };
        page.set_next_page_id(INVALID_PAGE_ID);
        page
    }

    /// Most entries a leaf of these key/value widths can hold.
    pub fn capacity() -> usize {
        (PAGE_SIZE - LEAF_HEADER_SIZE) / stride::<K, V>()
    }

    pub fn size(&self) -> usize {
        tree_page::size(self.data)
    }

    pub fn max_size(&self) -> usize {
        tree_page::max_size(self.data)
    }

    pub fn min_size(&self) -> usize {
        tree_page::min_size(self.data)
    }

    pub fn page_id(&self) -> PageId {
        tree_page::page_id(self.data)
    }

    pub fn parent_page_id(&self) -> PageId {
        tree_page::parent_page_id(self.data)
    }

    pub fn set_parent_page_id(&mut self, parent: PageId) {
        tree_page::set_parent_page_id(self.data, parent);
    }

    pub fn next_page_id(&self) -> PageId {
        next_page_id(self.data)
    }

    pub fn set_next_page_id(&mut self, next: PageId) {
        self.data[NEXT_PAGE_ID_OFFSET..NEXT_PAGE_ID_OFFSET + 4]
            .copy_from_slice(&next.as_u32().to_le_bytes());
    }

    pub fn key_at(&self, index: usize) -> K {
        debug_assert!(index < self.size());
        key_at::<K, V>(self.data, index)
    }

    pub fn value_at(&self, index: usize) -> V {
        debug_assert!(index < self.size());
        value_at::<K, V>(self.data, index)
    }

    pub fn lower_bound(&self, key: &K) -> usize {
        lower_bound::<K, V>(self.data, key)
    }

    pub fn lookup(&self, key: &K) -> Option<V> {
        let pos = self.lower_bound(key);
        if pos < self.size() && self.key_at(pos) == *key {
            Some(self.value_at(pos))
        } else {
            None
        }
    }

    pub fn entries(&self) -> Vec<(K, V)> {
        (0..self.size())
            .map(|i| (self.key_at(i), self.value_at(i)))
            .collect()
    }

    fn write_entry(&mut self, index: usize, key: &K, value: &V) {
        let off = entry_offset::<K, V>(index);
        key.encode_into(&mut self.data[off..off + K::ENCODED_LEN]);
        value.encode_into(
            &mut self.data[off + K::ENCODED_LEN..off + K::ENCODED_LEN + V::ENCODED_LEN],
        );
    }

    /// Inserts in sorted position; false on duplicate key. The caller
    /// guarantees room (size < capacity).
    pub fn insert(&mut self, key: &K, value: &V) -> bool {
        let size = self.size();
        debug_assert!(size < Self::capacity());
        let pos = self.lower_bound(key);
        if pos < size && self.key_at(pos) == *key {
            return false;
        }
        // Shift the tail one slot right; slots are contiguous
        self.data.copy_within(
            entry_offset::<K, V>(pos)..entry_offset::<K, V>(size),
            entry_offset::<K, V>(pos + 1),
        );
        self.write_entry(pos, key, value);
        tree_page::set_size(self.data, size + 1);
        true
    }

    /// Removes `key` if present, keeping slots contiguous.
    pub fn remove(&mut self, key: &K) -> bool {
        let size = self.size();
        let pos = self.lower_bound(key);
        if pos >= size || self.key_at(pos) != *key {
            return false;
        }
        self.data.copy_within(
            entry_offset::<K, V>(pos + 1)..entry_offset::<K, V>(size),
            entry_offset::<K, V>(pos),
        );
        tree_page::set_size(self.data, size - 1);
        true
    }

    /// Replaces the whole entry array (entries must be sorted).
    pub fn set_entries(&mut self, entries: &[(K, V)]) {
        debug_assert!(entries.len() <= Self::capacity());
        for (i, (k, v)) in entries.iter().enumerate() {
            self.write_entry(i, k, v);
        }
        tree_page::set_size(self.data, entries.len());
    }
}
