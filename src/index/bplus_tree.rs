use std::fmt::Write as _;
use std::io;
use std::marker::PhantomData;
use std::sync::Arc;

use log::warn;

use crate::buffer::BufferPoolManager;
use crate::common::{PageId, Result, StrataError, HEADER_PAGE_ID, INVALID_PAGE_ID};
use crate::storage::page::{HeaderPage, HeaderPageRef, MAX_INDEX_NAME_LEN};

use super::index_iterator::IndexIterator;
use super::index_key::{IndexKey, IndexValue};
use super::internal_page::{InternalPage, InternalPageRef};
use super::leaf_page::{LeafPage, LeafPageRef};
use super::tree_page;

/// A disk-paged B+tree with unique keys.
///
/// Every node is a buffer-pool page; nodes reference each other only by page
/// id, and each access goes through a fetch/unpin pair (the page guards).
/// The root page id is persisted in the header page under the index name,
/// so a tree can be reopened by name. Mutating operations take `&mut self`;
/// callers sharing a tree across threads put it behind their own lock.
pub struct BPlusTree<K, V> {
    index_name: String,
    root_page_id: PageId,
    bpm: Arc<BufferPoolManager>,
    leaf_max_size: usize,
    internal_max_size: usize,
    _marker: PhantomData<(K, V)>,
}

impl<K: IndexKey, V: IndexValue> BPlusTree<K, V> {
    /// Opens the index named `name`, creating it lazily on first insert.
    /// Node fan-outs are clamped to what a page can physically hold.
    pub fn new(
        name: &str,
        bpm: Arc<BufferPoolManager>,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Result<Self> {
        if name.is_empty() || name.len() > MAX_INDEX_NAME_LEN {
            return Err(StrataError::InvalidIndexName(name.to_string()));
        }
        let leaf_max_size = leaf_max_size.min(LeafPage::<K, V>::capacity());
        let internal_max_size = internal_max_size.min(InternalPage::<K>::capacity());
        assert!(leaf_max_size >= 2, "leaf nodes need room for two entries");
        assert!(internal_max_size >= 2, "internal nodes need room for two children");

        let root_page_id = {
            let guard = bpm.fetch_page_read(HEADER_PAGE_ID)?;
            HeaderPageRef::new(guard.data())
                .find_record(name)
                .unwrap_or(INVALID_PAGE_ID)
        };

        Ok(Self {
            index_name: name.to_string(),
            root_page_id,
            bpm,
            leaf_max_size,
            internal_max_size,
            _marker: PhantomData,
        })
    }

    pub fn is_empty(&self) -> bool {
        !self.root_page_id.is_valid()
    }

    pub fn root_page_id(&self) -> PageId {
        self.root_page_id
    }

    fn leaf_min_size(&self) -> usize {
        (self.leaf_max_size + 1) / 2
    }

    fn internal_min_size(&self) -> usize {
        (self.internal_max_size + 1) / 2
    }

    /// Records a root change in memory and in the header page.
    fn set_root(&mut self, new_root: PageId) -> Result<()> {
        self.root_page_id = new_root;
        let mut guard = self.bpm.fetch_page_write(HEADER_PAGE_ID)?;
        let mut header = HeaderPage::new(guard.data_mut());
        if !header.update_record(&self.index_name, new_root)
            && !header.insert_record(&self.index_name, new_root)
        {
            return Err(StrataError::IndexCorrupted("header page full".to_string()));
        }
        Ok(())
    }

    /// Descends to the leaf covering `key`, unpinning each internal page
    /// right after reading the child to follow.
    fn find_leaf_id(&self, key: &K) -> Result<PageId> {
        debug_assert!(!self.is_empty());
        let mut current = self.root_page_id;
        loop {
            let guard = self.bpm.fetch_page_read(current)?;
            if tree_page::is_leaf(guard.data()) {
                return Ok(current);
            }
            current = InternalPageRef::<K>::new(guard.data()).lookup_child(key);
        }
    }

    fn leftmost_leaf_id(&self) -> Result<PageId> {
        debug_assert!(!self.is_empty());
        let mut current = self.root_page_id;
        loop {
            let guard = self.bpm.fetch_page_read(current)?;
            if tree_page::is_leaf(guard.data()) {
                return Ok(current);
            }
            current = InternalPageRef::<K>::new(guard.data()).child_at(0);
        }
    }

    /// Point lookup; at most one value for a unique-key index.
    pub fn get_value(&self, key: &K) -> Result<Vec<V>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let leaf_id = self.find_leaf_id(key)?;
        let guard = self.bpm.fetch_page_read(leaf_id)?;
        let leaf = LeafPageRef::<K, V>::new(guard.data());
        Ok(leaf.lookup(key).into_iter().collect())
    }

    /// Inserts a key/value pair; false on a duplicate key.
    pub fn insert(&mut self, key: &K, value: &V) -> Result<bool> {
        if self.is_empty() {
            self.start_new_tree(key, value)?;
            return Ok(true);
        }

        let leaf_id = self.find_leaf_id(key)?;
        let mut guard = self.bpm.fetch_page_write(leaf_id)?;

        let (duplicate, size, parent_id, old_next) = {
            let leaf = LeafPageRef::<K, V>::new(guard.data());
            (
                leaf.lookup(key).is_some(),
                leaf.size(),
                leaf.parent_page_id(),
                leaf.next_page_id(),
            )
        };
        if duplicate {
            return Ok(false);
        }
        if size < self.leaf_max_size {
            LeafPage::<K, V>::new(guard.data_mut()).insert(key, value);
            return Ok(true);
        }

        // Full leaf: redistribute the sorted entry sequence over the old
        // leaf and a fresh sibling so both meet minimum occupancy
        let mut entries = LeafPageRef::<K, V>::new(guard.data()).entries();
        let pos = entries.partition_point(|(k, _)| k < key);
        entries.insert(pos, (*key, *value));
        let left_count = (entries.len() + 1) / 2;
        let separator = entries[left_count].0;

        // The sibling is fully built before the separator is published
        let mut new_guard = self.bpm.new_page()?;
        let new_leaf_id = new_guard.page_id();
        {
            let mut new_leaf = LeafPage::<K, V>::init(
                new_guard.data_mut(),
                new_leaf_id,
                parent_id,
                self.leaf_max_size,
            );
            new_leaf.set_entries(&entries[left_count..]);
            new_leaf.set_next_page_id(old_next);
        }
        {
            let mut leaf = LeafPage::<K, V>::new(guard.data_mut());
            leaf.set_entries(&entries[..left_count]);
            leaf.set_next_page_id(new_leaf_id);
        }
        drop(new_guard);
        drop(guard);

        self.insert_into_parent(leaf_id, separator, new_leaf_id, parent_id)?;
        Ok(true)
    }

    fn start_new_tree(&mut self, key: &K, value: &V) -> Result<()> {
        let mut guard = self.bpm.new_page()?;
        let root_id = guard.page_id();
        {
            let mut root = LeafPage::<K, V>::init(
                guard.data_mut(),
                root_id,
                INVALID_PAGE_ID,
                self.leaf_max_size,
            );
            root.insert(key, value);
        }
        drop(guard);
        self.set_root(root_id)
    }

    /// Publishes the separator of a split: grows a new root when `left_id`
    /// was the root, inserts into the parent when it has room, and splits
    /// the parent recursively otherwise.
    fn insert_into_parent(
        &mut self,
        left_id: PageId,
        separator: K,
        right_id: PageId,
        parent_id: PageId,
    ) -> Result<()> {
        if !parent_id.is_valid() {
            let mut guard = self.bpm.new_page()?;
            let new_root_id = guard.page_id();
            {
                let mut root = InternalPage::<K>::init(
                    guard.data_mut(),
                    new_root_id,
                    INVALID_PAGE_ID,
                    self.internal_max_size,
                );
                root.populate_new_root(left_id, &separator, right_id);
            }
            drop(guard);
            for child in [left_id, right_id] {
                let mut child_guard = self.bpm.fetch_page_write(child)?;
                tree_page::set_parent_page_id(child_guard.data_mut(), new_root_id);
            }
            return self.set_root(new_root_id);
        }

        let mut guard = self.bpm.fetch_page_write(parent_id)?;
        let size = InternalPageRef::<K>::new(guard.data()).size();
        if size < self.internal_max_size {
            InternalPage::<K>::new(guard.data_mut()).insert(&separator, right_id);
            return Ok(());
        }

        // Split the parent: the median key moves up, children are
        // partitioned so both halves meet minimum occupancy
        let mut pairs = InternalPageRef::<K>::new(guard.data()).pairs();
        let grandparent_id = InternalPageRef::<K>::new(guard.data()).parent_page_id();
        let pos = 1 + pairs[1..].partition_point(|(k, _)| *k <= separator);
        pairs.insert(pos, (separator, right_id));
        let left_count = (pairs.len() + 1) / 2;
        let promoted = pairs[left_count].0;

        let mut new_guard = self.bpm.new_page()?;
        let new_internal_id = new_guard.page_id();
        {
            let mut new_node = InternalPage::<K>::init(
                new_guard.data_mut(),
                new_internal_id,
                grandparent_id,
                self.internal_max_size,
            );
            new_node.set_pairs(&pairs[left_count..]);
        }
        {
            let mut parent = InternalPage::<K>::new(guard.data_mut());
            parent.set_pairs(&pairs[..left_count]);
        }
        drop(new_guard);
        drop(guard);

        // Migrated children now hang off the new node
        for (_, child) in &pairs[left_count..] {
            let mut child_guard = self.bpm.fetch_page_write(*child)?;
            tree_page::set_parent_page_id(child_guard.data_mut(), new_internal_id);
        }

        self.insert_into_parent(parent_id, promoted, new_internal_id, grandparent_id)
    }

    /// Deletes `key` if present, rebalancing on underflow.
    pub fn remove(&mut self, key: &K) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let leaf_id = self.find_leaf_id(key)?;

        let size = {
            let mut guard = self.bpm.fetch_page_write(leaf_id)?;
            if LeafPageRef::<K, V>::new(guard.data()).lookup(key).is_none() {
                return Ok(());
            }
            let mut leaf = LeafPage::<K, V>::new(guard.data_mut());
            leaf.remove(key);
            leaf.size()
        };

        if leaf_id == self.root_page_id {
            if size == 0 {
                self.bpm.delete_page(leaf_id)?;
                return self.set_root(INVALID_PAGE_ID);
            }
            return Ok(());
        }
        if size >= self.leaf_min_size() {
            return Ok(());
        }
        self.rebalance_leaf(leaf_id)
    }

    /// Restores minimum occupancy of an underflowing non-root leaf by
    /// borrowing from a same-parent sibling, or merging with it and pulling
    /// the separator out of the parent.
    fn rebalance_leaf(&mut self, page_id: PageId) -> Result<()> {
        let parent_id = {
            let guard = self.bpm.fetch_page_read(page_id)?;
            LeafPageRef::<K, V>::new(guard.data()).parent_page_id()
        };
        let mut parent_guard = self.bpm.fetch_page_write(parent_id)?;
        let idx = InternalPageRef::<K>::new(parent_guard.data())
            .child_index_of(page_id)
            .ok_or_else(|| {
                StrataError::IndexCorrupted(format!("{page_id} missing from its parent"))
            })?;
        if InternalPageRef::<K>::new(parent_guard.data()).size() < 2 {
            // Degenerate single-child parent (tiny fan-out): nothing to
            // borrow from or merge with
            return Ok(());
        }

        if idx > 0 {
            let left_id = InternalPageRef::<K>::new(parent_guard.data()).child_at(idx - 1);
            let mut left_guard = self.bpm.fetch_page_write(left_id)?;
            let mut node_guard = self.bpm.fetch_page_write(page_id)?;

            let mut left_entries = LeafPageRef::<K, V>::new(left_guard.data()).entries();
            if left_entries.len() > self.leaf_min_size() {
                // Borrow the left sibling's last entry
                let moved = left_entries.pop().expect("sibling above minimum");
                LeafPage::<K, V>::new(left_guard.data_mut()).set_entries(&left_entries);
                LeafPage::<K, V>::new(node_guard.data_mut()).insert(&moved.0, &moved.1);
                InternalPage::<K>::new(parent_guard.data_mut()).set_key_at(idx, &moved.0);
                return Ok(());
            }

            // Merge this node into the left sibling
            let node_entries = LeafPageRef::<K, V>::new(node_guard.data()).entries();
            let node_next = LeafPageRef::<K, V>::new(node_guard.data()).next_page_id();
            {
                let mut left = LeafPage::<K, V>::new(left_guard.data_mut());
                left_entries.extend(node_entries);
                left.set_entries(&left_entries);
                left.set_next_page_id(node_next);
            }
            InternalPage::<K>::new(parent_guard.data_mut()).remove_at(idx);
            let parent_size = InternalPageRef::<K>::new(parent_guard.data()).size();
            drop(node_guard);
            drop(left_guard);
            drop(parent_guard);
            self.bpm.delete_page(page_id)?;
            self.check_internal_after_delete(parent_id, parent_size)
        } else {
            let right_id = InternalPageRef::<K>::new(parent_guard.data()).child_at(1);
            let mut right_guard = self.bpm.fetch_page_write(right_id)?;
            let mut node_guard = self.bpm.fetch_page_write(page_id)?;

            let right_entries = LeafPageRef::<K, V>::new(right_guard.data()).entries();
            if right_entries.len() > self.leaf_min_size() {
                // Borrow the right sibling's first entry
                let moved = right_entries[0];
                LeafPage::<K, V>::new(right_guard.data_mut()).set_entries(&right_entries[1..]);
                LeafPage::<K, V>::new(node_guard.data_mut()).insert(&moved.0, &moved.1);
                InternalPage::<K>::new(parent_guard.data_mut())
                    .set_key_at(1, &right_entries[1].0);
                return Ok(());
            }

            // Merge the right sibling into this node
            let right_next = LeafPageRef::<K, V>::new(right_guard.data()).next_page_id();
            {
                let mut node = LeafPage::<K, V>::new(node_guard.data_mut());
                let mut all = node.entries();
                all.extend(right_entries);
                node.set_entries(&all);
                node.set_next_page_id(right_next);
            }
            InternalPage::<K>::new(parent_guard.data_mut()).remove_at(1);
            let parent_size = InternalPageRef::<K>::new(parent_guard.data()).size();
            drop(node_guard);
            drop(right_guard);
            drop(parent_guard);
            self.bpm.delete_page(right_id)?;
            self.check_internal_after_delete(parent_id, parent_size)
        }
    }

    /// Post-merge check of an internal node: the root collapses when down
    /// to one child, any other node rebalances below minimum occupancy.
    fn check_internal_after_delete(&mut self, node_id: PageId, size: usize) -> Result<()> {
        if node_id == self.root_page_id {
            if size == 1 {
                return self.collapse_root(node_id);
            }
            return Ok(());
        }
        if size < self.internal_min_size() {
            return self.rebalance_internal(node_id);
        }
        Ok(())
    }

    /// Replaces an internal root holding a single child with that child.
    fn collapse_root(&mut self, old_root: PageId) -> Result<()> {
        let child_id = {
            let guard = self.bpm.fetch_page_read(old_root)?;
            InternalPageRef::<K>::new(guard.data()).child_at(0)
        };
        {
            let mut child_guard = self.bpm.fetch_page_write(child_id)?;
            tree_page::set_parent_page_id(child_guard.data_mut(), INVALID_PAGE_ID);
        }
        self.set_root(child_id)?;
        self.bpm.delete_page(old_root)?;
        Ok(())
    }

    /// Internal-node counterpart of `rebalance_leaf`: borrowing rotates the
    /// separator through the parent, merging pulls it down into the merged
    /// node.
    fn rebalance_internal(&mut self, page_id: PageId) -> Result<()> {
        let parent_id = {
            let guard = self.bpm.fetch_page_read(page_id)?;
            InternalPageRef::<K>::new(guard.data()).parent_page_id()
        };
        let mut parent_guard = self.bpm.fetch_page_write(parent_id)?;
        let idx = InternalPageRef::<K>::new(parent_guard.data())
            .child_index_of(page_id)
            .ok_or_else(|| {
                StrataError::IndexCorrupted(format!("{page_id} missing from its parent"))
            })?;
        if InternalPageRef::<K>::new(parent_guard.data()).size() < 2 {
            return Ok(());
        }

        if idx > 0 {
            let left_id = InternalPageRef::<K>::new(parent_guard.data()).child_at(idx - 1);
            let mut left_guard = self.bpm.fetch_page_write(left_id)?;
            let mut node_guard = self.bpm.fetch_page_write(page_id)?;

            let separator = InternalPageRef::<K>::new(parent_guard.data()).key_at(idx);
            let mut left_pairs = InternalPageRef::<K>::new(left_guard.data()).pairs();

            if left_pairs.len() > self.internal_min_size() {
                // Rotate the left sibling's last child through the parent
                let (new_separator, moved_child) =
                    left_pairs.pop().expect("sibling above minimum");
                {
                    let mut node = InternalPage::<K>::new(node_guard.data_mut());
                    let mut pairs = node.pairs();
                    pairs[0].0 = separator;
                    pairs.insert(0, (new_separator, moved_child));
                    node.set_pairs(&pairs);
                }
                InternalPage::<K>::new(left_guard.data_mut()).set_pairs(&left_pairs);
                InternalPage::<K>::new(parent_guard.data_mut()).set_key_at(idx, &new_separator);
                drop(node_guard);
                drop(left_guard);
                drop(parent_guard);
                let mut child_guard = self.bpm.fetch_page_write(moved_child)?;
                tree_page::set_parent_page_id(child_guard.data_mut(), page_id);
                return Ok(());
            }

            // Merge this node into the left sibling; the separator comes
            // down as the key for this node's first child
            let mut node_pairs = InternalPageRef::<K>::new(node_guard.data()).pairs();
            node_pairs[0].0 = separator;
            {
                let mut left = InternalPage::<K>::new(left_guard.data_mut());
                let mut all = left.pairs();
                all.extend(node_pairs.iter().copied());
                left.set_pairs(&all);
            }
            InternalPage::<K>::new(parent_guard.data_mut()).remove_at(idx);
            let parent_size = InternalPageRef::<K>::new(parent_guard.data()).size();
            drop(node_guard);
            drop(left_guard);
            drop(parent_guard);
            for (_, child) in &node_pairs {
                let mut child_guard = self.bpm.fetch_page_write(*child)?;
                tree_page::set_parent_page_id(child_guard.data_mut(), left_id);
            }
            self.bpm.delete_page(page_id)?;
            self.check_internal_after_delete(parent_id, parent_size)
        } else {
            let right_id = InternalPageRef::<K>::new(parent_guard.data()).child_at(1);
            let mut right_guard = self.bpm.fetch_page_write(right_id)?;
            let mut node_guard = self.bpm.fetch_page_write(page_id)?;

            let separator = InternalPageRef::<K>::new(parent_guard.data()).key_at(1);
            let right_pairs = InternalPageRef::<K>::new(right_guard.data()).pairs();

            if right_pairs.len() > self.internal_min_size() {
                // Rotate the right sibling's first child into this node
                let moved_child = right_pairs[0].1;
                let new_separator = right_pairs[1].0;
                {
                    let mut node = InternalPage::<K>::new(node_guard.data_mut());
                    let mut pairs = node.pairs();
                    pairs.push((separator, moved_child));
                    node.set_pairs(&pairs);
                }
                InternalPage::<K>::new(right_guard.data_mut()).set_pairs(&right_pairs[1..]);
                InternalPage::<K>::new(parent_guard.data_mut()).set_key_at(1, &new_separator);
                drop(node_guard);
                drop(right_guard);
                drop(parent_guard);
                let mut child_guard = self.bpm.fetch_page_write(moved_child)?;
                tree_page::set_parent_page_id(child_guard.data_mut(), page_id);
                return Ok(());
            }

            // Merge the right sibling into this node
            let mut migrated = right_pairs.clone();
            migrated[0].0 = separator;
            {
                let mut node = InternalPage::<K>::new(node_guard.data_mut());
                let mut all = node.pairs();
                all.extend(migrated.iter().copied());
                node.set_pairs(&all);
            }
            InternalPage::<K>::new(parent_guard.data_mut()).remove_at(1);
            let parent_size = InternalPageRef::<K>::new(parent_guard.data()).size();
            drop(node_guard);
            drop(right_guard);
            drop(parent_guard);
            for (_, child) in &right_pairs {
                let mut child_guard = self.bpm.fetch_page_write(*child)?;
                tree_page::set_parent_page_id(child_guard.data_mut(), page_id);
            }
            self.bpm.delete_page(right_id)?;
            self.check_internal_after_delete(parent_id, parent_size)
        }
    }

    /// Iterator positioned at the smallest key.
    pub fn iter(&self) -> Result<IndexIterator<K, V>> {
        if self.is_empty() {
            return Ok(IndexIterator::empty(Arc::clone(&self.bpm)));
        }
        let leaf_id = self.leftmost_leaf_id()?;
        let guard = self.bpm.fetch_page_read(leaf_id)?;
        Ok(IndexIterator::new(Arc::clone(&self.bpm), guard, 0))
    }

    /// Iterator positioned at the lower bound of `key` within its leaf,
    /// whether or not the key is present.
    pub fn iter_from(&self, key: &K) -> Result<IndexIterator<K, V>> {
        if self.is_empty() {
            return Ok(IndexIterator::empty(Arc::clone(&self.bpm)));
        }
        let leaf_id = self.find_leaf_id(key)?;
        let guard = self.bpm.fetch_page_read(leaf_id)?;
        let index = LeafPageRef::<K, V>::new(guard.data()).lower_bound(key);
        Ok(IndexIterator::new(Arc::clone(&self.bpm), guard, index))
    }

    /// Indented text rendering of the whole tree.
    pub fn dump(&self) -> Result<String> {
        let mut out = String::new();
        if self.is_empty() {
            warn!("dumping an empty tree");
            return Ok(out);
        }
        self.dump_node(self.root_page_id, 0, &mut out)?;
        Ok(out)
    }

    fn dump_node(&self, page_id: PageId, depth: usize, out: &mut String) -> Result<()> {
        let guard = self.bpm.fetch_page_read(page_id)?;
        let indent = "  ".repeat(depth);
        if tree_page::is_leaf(guard.data()) {
            let leaf = LeafPageRef::<K, V>::new(guard.data());
            let keys: Vec<String> = (0..leaf.size())
                .map(|i| format!("{:?}", leaf.key_at(i)))
                .collect();
            let _ = writeln!(
                out,
                "{indent}leaf {page_id} [{}] next={}",
                keys.join(", "),
                leaf.next_page_id()
            );
            Ok(())
        } else {
            let node = InternalPageRef::<K>::new(guard.data());
            let keys: Vec<String> = (1..node.size())
                .map(|i| format!("{:?}", node.key_at(i)))
                .collect();
            let _ = writeln!(out, "{indent}internal {page_id} [{}]", keys.join(", "));
            let children: Vec<PageId> = (0..node.size()).map(|i| node.child_at(i)).collect();
            drop(guard);
            for child in children {
                self.dump_node(child, depth + 1, out)?;
            }
            Ok(())
        }
    }

    /// Graphviz rendering of the whole tree.
    pub fn draw<W: io::Write>(&self, out: &mut W) -> Result<()> {
        if self.is_empty() {
            warn!("drawing an empty tree");
            return Ok(());
        }
        writeln!(out, "digraph BPlusTree {{")?;
        writeln!(out, "  node [shape=record];")?;
        self.draw_node(self.root_page_id, out)?;
        writeln!(out, "}}")?;
        Ok(())
    }

    fn draw_node<W: io::Write>(&self, page_id: PageId, out: &mut W) -> Result<()> {
        let guard = self.bpm.fetch_page_read(page_id)?;
        if tree_page::is_leaf(guard.data()) {
            let leaf = LeafPageRef::<K, V>::new(guard.data());
            let keys: Vec<String> = (0..leaf.size())
                .map(|i| format!("{:?}", leaf.key_at(i)))
                .collect();
            writeln!(
                out,
                "  page{} [label=\"leaf {}|{}\"];",
                page_id.as_u32(),
                page_id.as_u32(),
                keys.join("|")
            )?;
            let next = leaf.next_page_id();
            if next.is_valid() {
                writeln!(
                    out,
                    "  page{} -> page{} [style=dashed];",
                    page_id.as_u32(),
                    next.as_u32()
                )?;
            }
            Ok(())
        } else {
            let node = InternalPageRef::<K>::new(guard.data());
            let keys: Vec<String> = (1..node.size())
                .map(|i| format!("{:?}", node.key_at(i)))
                .collect();
            writeln!(
                out,
                "  page{} [label=\"internal {}|{}\"];",
                page_id.as_u32(),
                page_id.as_u32(),
                keys.join("|")
            )?;
            let children: Vec<PageId> = (0..node.size()).map(|i| node.child_at(i)).collect();
            drop(guard);
            for child in &children {
                writeln!(out, "  page{} -> page{};", page_id.as_u32(), child.as_u32())?;
            }
            for child in children {
                self.draw_node(child, out)?;
            }
            Ok(())
        }
    }
}
