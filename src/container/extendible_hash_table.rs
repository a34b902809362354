use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;

/// A bucket of key/value pairs with unique keys
#[derive(Debug)]
struct Bucket<K, V> {
    local_depth: usize,
    items: Vec<(K, V)>,
}

impl<K, V> Bucket<K, V> {
    fn new(local_depth: usize) -> Self {
        Self {
            local_depth,
            items: Vec::new(),
        }
    }
}

/// Directory state guarded by the table mutex.
///
/// Buckets live in a slab and the directory maps each of its
/// `1 << global_depth` slots to a slab index; slab-index equality is the
/// bucket identity used when redirecting slots during a split.
struct Directory<K, V> {
    global_depth: usize,
    dir: Vec<usize>,
    buckets: Vec<Bucket<K, V>>,
}

/// In-memory extendible hash table.
///
/// Buckets hold at most `bucket_size` entries; inserting into a full bucket
/// splits it, doubling the directory whenever the bucket's local depth has
/// caught up with the global depth. A single table-wide mutex guards all
/// operations.
pub struct ExtendibleHashTable<K, V> {
    bucket_size: usize,
    inner: Mutex<Directory<K, V>>,
}

impl<K, V> ExtendibleHashTable<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates a table with the given bucket capacity (>= 1). Starts with a
    /// single bucket at depth zero.
    pub fn new(bucket_size: usize) -> Self {
        assert!(bucket_size >= 1, "bucket_size must be at least 1");
        Self {
            bucket_size,
            inner: Mutex::new(Directory {
                global_depth: 0,
                dir: vec![0],
                buckets: vec![Bucket::new(0)],
            }),
        }
    }

    fn hash_of(key: &K) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    fn index_of(hash: u64, global_depth: usize) -> usize {
        (hash & ((1u64 << global_depth) - 1)) as usize
    }

    /// Looks up the value stored under `key`.
    pub fn find(&self, key: &K) -> Option<V> {
        let inner = self.inner.lock();
        let slot = Self::index_of(Self::hash_of(key), inner.global_depth);
        let bucket = &inner.buckets[inner.dir[slot]];
        bucket
            .items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Inserts or updates the pair. Updating an existing key never splits;
    /// inserting into a full bucket splits until room exists.
    pub fn insert(&self, key: K, value: V) {
        let mut inner = self.inner.lock();
        let hash = Self::hash_of(&key);

        let slot = Self::index_of(hash, inner.global_depth);
        let bucket_idx = inner.dir[slot];
        if let Some(item) = inner.buckets[bucket_idx]
            .items
            .iter_mut()
            .find(|(k, _)| *k == key)
        {
            item.1 = value;
            return;
        }

        loop {
            let slot = Self::index_of(hash, inner.global_depth);
            let bucket_idx = inner.dir[slot];
            if inner.buckets[bucket_idx].items.len() < self.bucket_size {
                inner.buckets[bucket_idx].items.push((key, value));
                return;
            }
            Self::split_bucket(&mut inner, bucket_idx);
        }
    }

    /// Splits `bucket_idx`, doubling the directory first when its local
    /// depth equals the global depth.
    fn split_bucket(inner: &mut Directory<K, V>, bucket_idx: usize) {
        let depth = inner.buckets[bucket_idx].local_depth;

        if depth == inner.global_depth {
            // Append a copy of the first half so every old index i has a
            // twin i + old_size referencing the same bucket
            inner.dir.extend_from_within(..);
            inner.global_depth += 1;
        }

        inner.buckets[bucket_idx].local_depth = depth + 1;
        let sibling_idx = inner.buckets.len();
        inner.buckets.push(Bucket::new(depth + 1));

        // Entries whose hash bit `depth` is set move to the sibling
        let items = std::mem::take(&mut inner.buckets[bucket_idx].items);
        for (k, v) in items {
            if (Self::hash_of(&k) >> depth) & 1 == 1 {
                inner.buckets[sibling_idx].items.push((k, v));
            } else {
                inner.buckets[bucket_idx].items.push((k, v));
            }
        }

        for slot in 0..inner.dir.len() {
            if inner.dir[slot] == bucket_idx && (slot >> depth) & 1 == 1 {
                inner.dir[slot] = sibling_idx;
            }
        }
    }

    /// Removes `key`, reporting whether it was present.
    pub fn remove(&self, key: &K) -> bool {
        let mut inner = self.inner.lock();
        let slot = Self::index_of(Self::hash_of(key), inner.global_depth);
        let bucket_idx = inner.dir[slot];
        let items = &mut inner.buckets[bucket_idx].items;
        match items.iter().position(|(k, _)| k == key) {
            Some(pos) => {
                items.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Number of hash bits used by the directory.
    pub fn global_depth(&self) -> usize {
        self.inner.lock().global_depth
    }

    /// Number of hash bits used by the bucket referenced at `dir_index`.
    pub fn local_depth(&self, dir_index: usize) -> usize {
        let inner = self.inner.lock();
        inner.buckets[inner.dir[dir_index]].local_depth
    }

    /// Count of distinct bucket instances.
    pub fn num_buckets(&self) -> usize {
        self.inner.lock().buckets.len()
    }

    /// Total number of stored entries.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner.buckets.iter().map(|b| b.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Asserts the structural invariants of the directory. Intended for
    /// tests and debugging; panics on violation.
    pub fn check_integrity(&self) {
        let inner = self.inner.lock();
        assert_eq!(
            inner.dir.len(),
            1 << inner.global_depth,
            "directory length must be 2^global_depth"
        );

        let mut ref_counts = vec![0usize; inner.buckets.len()];
        let mut suffix: Vec<Option<usize>> = vec![None; inner.buckets.len()];
        for (slot, &bucket_idx) in inner.dir.iter().enumerate() {
            let bucket = &inner.buckets[bucket_idx];
            assert!(
                bucket.local_depth <= inner.global_depth,
                "local depth exceeds global depth"
            );
            ref_counts[bucket_idx] += 1;

            // Every slot referencing a bucket agrees on the low local_depth bits
            let mask = (1 << bucket.local_depth) - 1;
            match suffix[bucket_idx] {
                None => suffix[bucket_idx] = Some(slot & mask),
                Some(expected) => assert_eq!(slot & mask, expected, "inconsistent bucket suffix"),
            }
        }

        for (idx, bucket) in inner.buckets.iter().enumerate() {
            assert_eq!(
                ref_counts[idx],
                1 << (inner.global_depth - bucket.local_depth),
                "bucket referenced by the wrong number of slots"
            );
            assert!(bucket.items.len() <= self.bucket_size, "bucket over capacity");
            for (k, _) in &bucket.items {
                let slot = Self::index_of(Self::hash_of(k), inner.global_depth);
                assert_eq!(inner.dir[slot], idx, "entry hashed to a foreign bucket");
            }
        }
    }
}
