use std::marker::PhantomData;

use crate::common::{PageId, PAGE_SIZE};

use super::index_key::IndexKey;
use super::tree_page::{self, TreePageType, TREE_PAGE_HEADER_SIZE};

// Internal pages store `size` children as uniform (key, child) pairs right
// after the shared header; pair 0's key bytes are never consulted. Pair i
// (i >= 1) carries the separator key_i for child_i: child_i roots the
// subtree of keys in [key_i, key_{i+1}).
const INTERNAL_HEADER_SIZE: usize = TREE_PAGE_HEADER_SIZE;
const CHILD_LEN: usize = 4;

fn stride<K: IndexKey>() -> usize {
    K::ENCODED_LEN + CHILD_LEN
}

fn pair_offset<K: IndexKey>(index: usize) -> usize {
    INTERNAL_HEADER_SIZE + index * stride::<K>()
}

fn key_at<K: IndexKey>(data: &[u8], index: usize) -> K {
    let off = pair_offset::<K>(index);
    K::decode_from(&data[off..off + K::ENCODED_LEN])
}

fn child_at<K: IndexKey>(data: &[u8], index: usize) -> PageId {
    let off = pair_offset::<K>(index) + K::ENCODED_LEN;
    PageId::new(u32::from_le_bytes(data[off..off + CHILD_LEN].try_into().unwrap()))
}

/// First slot in 1..size whose key is > `key`; `size` when none is.
fn upper_bound<K: IndexKey>(data: &[u8], key: &K) -> usize {
    let mut lo = 1;
    let mut hi = tree_page::size(data);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if key_at::<K>(data, mid) <= *key {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Read-only view of an internal page.
pub struct InternalPageRef<'a, K> {
    data: &'a [u8],
    _marker: PhantomData<K>,
}

impl<'a, K: IndexKey> InternalPageRef<'a, K> {
    pub fn new(data: &'a [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        debug_assert!(!tree_page::is_leaf(data));
        Self {
            data,
            _marker: PhantomData,
        }
    }

    /// Number of children held (one more than the number of real keys).
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

    /// Separator key of slot `index` (meaningful for index >= 1).
    pub fn key_at(&self, index: usize) -> K {
        debug_assert!(index >= 1 && index < self.size());
        key_at::<K>(self.data, index)
    }

    pub fn child_at(&self, index: usize) -> PageId {
        debug_assert!(index < self.size());
        child_at::<K>(self.data, index)
    }

    /// Child covering `key`: the one under the greatest separator <= key.
    pub fn lookup_child(&self, key: &K) -> PageId {
        let idx = upper_bound::<K>(self.data, key);
        child_at::<K>(self.data, idx - 1)
    }

    /// Slot currently pointing at `page_id`.
    pub fn child_index_of(&self, page_id: PageId) -> Option<usize> {
        (0..self.size()).find(|&i| child_at::<K>(self.data, i) == page_id)
    }

    /// All (key, child) pairs; pair 0's key is the unused slot-zero filler.
    pub fn pairs(&self) -> Vec<(K, PageId)> {
        (0..self.size())
            .map(|i| (key_at::<K>(self.data, i), child_at::<K>(self.data, i)))
            .collect()
    }
}

/// Mutable view of an internal page.
pub struct InternalPage<'a, K> {
    data: &'a mut [u8],
    _marker: PhantomData<K>,
}

impl<'a, K: IndexKey> InternalPage<'a, K> {
    pub fn new(data: &'a mut [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        debug_assert!(!tree_page::is_leaf(data));
        Self {
            data,
            _marker: PhantomData,
        }
    }

    /// Formats a raw page as an empty internal node.
    pub fn init(data: &'a mut [u8], page_id: PageId, parent: PageId, max_size: usize) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        assert!(max_size >= 2 && max_size <= Self::capacity());
        data.fill(0);
        tree_page::set_page_type(data, TreePageType::Internal);
        tree_page::set_size(data, 0);
        tree_page::set_max_size(data, max_size);
        tree_page::set_page_id(data, page_id);
        tree_page::set_parent_page_id(data, parent);
        Self {
            data,
            _marker: PhantomData,
        }
    }

    /// Most children an internal node of this key width can hold.
    pub fn capacity() -> usize {
        (PAGE_SIZE - INTERNAL_HEADER_SIZE) / stride::<K>()
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

    pub fn key_at(&self, index: usize) -> K {
        debug_assert!(index >= 1 && index < self.size());
        key_at::<K>(self.data, index)
    }

    pub fn set_key_at(&mut self, index: usize, key: &K) {
        debug_assert!(index >= 1 && index < self.size());
        let off = pair_offset::<K>(index);
        key.encode_into(&mut self.data[off..off + K::ENCODED_LEN]);
    }

    pub fn child_at(&self, index: usize) -> PageId {
        debug_assert!(index < self.size());
        child_at::<K>(self.data, index)
    }

    pub fn lookup_child(&self, key: &K) -> PageId {
        let idx = upper_bound::<K>(self.data, key);
        child_at::<K>(self.data, idx - 1)
    }

    pub fn child_index_of(&self, page_id: PageId) -> Option<usize> {
        (0..self.size()).find(|&i| child_at::<K>(self.data, i) == page_id)
    }

    pub fn pairs(&self) -> Vec<(K, PageId)> {
        (0..self.size())
            .map(|i| (key_at::<K>(self.data, i), child_at::<K>(self.data, i)))
            .collect()
    }

    fn write_pair(&mut self, index: usize, key: &K, child: PageId) {
        let off = pair_offset::<K>(index);
        key.encode_into(&mut self.data[off..off + K::ENCODED_LEN]);
        self.data[off + K::ENCODED_LEN..off + K::ENCODED_LEN + CHILD_LEN]
            .copy_from_slice(&child.as_u32().to_le_bytes());
    }

    /// Seeds a fresh root with two children separated by `key`.
    pub fn populate_new_root(&mut self, left: PageId, key: &K, right: PageId) {
        debug_assert_eq!(self.size(), 0);
        self.write_pair(0, key, left);
        self.write_pair(1, key, right);
        tree_page::set_size(self.data, 2);
    }

    /// Inserts a separator and its right child in key order. The caller
    /// guarantees room (size < capacity).
    pub fn insert(&mut self, key: &K, child: PageId) {
        let size = self.size();
        debug_assert!(size >= 1 && size < Self::capacity());
        let pos = upper_bound::<K>(self.data, key);
        self.data.copy_within(
            pair_offset::<K>(pos)..pair_offset::<K>(size),
            pair_offset::<K>(pos + 1),
        );
        self.write_pair(pos, key, child);
        tree_page::set_size(self.data, size + 1);
    }

    /// Drops the pair at `index` (>= 1), shifting the tail left.
    pub fn remove_at(&mut self, index: usize) {
        let size = self.size();
        debug_assert!(index >= 1 && index < size);
        self.data.copy_within(
            pair_offset::<K>(index + 1)..pair_offset::<K>(size),
            pair_offset::<K>(index),
        );
        tree_page::set_size(self.data, size - 1);
    }

    /// Replaces the whole pair array.
    pub fn set_pairs(&mut self, pairs: &[(K, PageId)]) {
        debug_assert!(pairs.len() <= Self::capacity());
        for (i, (k, c)) in pairs.iter().enumerate() {
            self.write_pair(i, k, *c);
        }
        tree_page::set_size(self.data, pairs.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::INVALID_PAGE_ID;

    #[test]
    fn test_new_root_and_child_lookup() {
        let mut data = [0u8; PAGE_SIZE];
        let mut node =
            InternalPage::<u64>::init(&mut data, PageId::new(5), INVALID_PAGE_ID, 8);
        node.populate_new_root(PageId::new(1), &10, PageId::new(2));

        assert_eq!(node.size(), 2);
        assert_eq!(node.lookup_child(&5), PageId::new(1));
        assert_eq!(node.lookup_child(&10), PageId::new(2));
        assert_eq!(node.lookup_child(&99), PageId::new(2));
    }

    #[test]
    fn test_insert_keeps_separator_order() {
        let mut data = [0u8; PAGE_SIZE];
        let mut node =
            InternalPage::<u64>::init(&mut data, PageId::new(5), INVALID_PAGE_ID, 8);
        node.populate_new_root(PageId::new(1), &20, PageId::new(2));
        node.insert(&40, PageId::new(3));
        node.insert(&30, PageId::new(4));

        assert_eq!(node.size(), 4);
        assert_eq!(node.key_at(1), 20);
        assert_eq!(node.key_at(2), 30);
        assert_eq!(node.key_at(3), 40);
        assert_eq!(node.lookup_child(&35), PageId::new(4));
        assert_eq!(node.lookup_child(&45), PageId::new(3));
        assert_eq!(node.child_index_of(PageId::new(4)), Some(2));
    }

    #[test]
    fn test_remove_at_closes_gap() {
        let mut data = [0u8; PAGE_SIZE];
        let mut node =
            InternalPage::<u64>::init(&mut data, PageId::new(5), INVALID_PAGE_ID, 8);
        node.populate_new_root(PageId::new(1), &20, PageId::new(2));
        node.insert(&30, PageId::new(3));

        node.remove_at(1);
        assert_eq!(node.size(), 2);
        assert_eq!(node.key_at(1), 30);
        assert_eq!(node.child_at(1), PageId::new(3));
    }
}
