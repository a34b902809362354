use std::marker::PhantomData;
use std::sync::Arc;

use crate::buffer::{BufferPoolManager, ReadPageGuard};
use crate::common::Result;

use super::index_key::{IndexKey, IndexValue};
use super::leaf_page::LeafPageRef;

/// Ordered iterator over the leaf chain.
///
/// Holds the current leaf pinned through a read guard plus a slot index;
/// stepping past the last slot unpins the leaf and follows `next_page_id`.
/// Exhaustion is the end sentinel. Items are `Result` so a pool-exhausted
/// fetch surfaces mid-scan.
pub struct IndexIterator<K, V> {
    bpm: Arc<BufferPoolManager>,
    guard: Option<ReadPageGuard>,
    index: usize,
    _marker: PhantomData<(K, V)>,
}

impl<K: IndexKey, V: IndexValue> IndexIterator<K, V> {
    pub(crate) fn new(bpm: Arc<BufferPoolManager>, guard: ReadPageGuard, index: usize) -> Self {
        Self {
            bpm,
            guard: Some(guard),
            index,
            _marker: PhantomData,
        }
    }

    pub(crate) fn empty(bpm: Arc<BufferPoolManager>) -> Self {
        Self {
            bpm,
            guard: None,
            index: 0,
            _marker: PhantomData,
        }
    }

    /// True once the iterator has run off the end of the leaf chain.
    pub fn is_end(&self) -> bool {
        self.guard.is_none()
    }
}

impl<K: IndexKey, V: IndexValue> Iterator for IndexIterator<K, V> {
    type Item = Result<(K, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (entry, next_id) = {
                let guard = self.guard.as_ref()?;
                let leaf = LeafPageRef::<K, V>::new(guard.data());
                if self.index < leaf.size() {
                    (Some(leaf.entry_at(self.index)), None)
                } else {
                    (None, Some(leaf.next_page_id()))
                }
            };

            if let Some(entry) = entry {
                self.index += 1;
                return Some(Ok(entry));
            }

            // Unpin the exhausted leaf before pinning its successor
            self.guard = None;
            self.index = 0;
            let next_id = next_id.expect("leaf end implies a next link");
            if !next_id.is_valid() {
                return None;
            }
            match self.bpm.fetch_page_read(next_id) {
                Ok(guard) => self.guard = Some(guard),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
