//! Strata - the storage-and-indexing core of a disk-oriented RDBMS
//!
//! The crate mediates between fixed-size on-disk pages and in-memory
//! working copies, and builds a B+tree index on top of that machinery.
//!
//! # Architecture
//!
//! Bottom-up:
//!
//! - **Storage** (`storage`): disk I/O and raw page formats
//!   - `DiskManager`: page-indexed reads and writes of one database file
//!   - `DiskScheduler`: background worker funneling page I/O
//!   - `HeaderPage`: the page-0 table of `{index name -> root page id}`
//! - **Container** (`container`): in-memory associative structures
//!   - `ExtendibleHashTable`: directory-doubling hash table, also the
//!     buffer pool's page table
//! - **Buffer** (`buffer`): the page cache
//!   - `BufferPoolManager`: frame array, free list, page table and
//!     eviction, serving pages through pinning RAII guards
//!   - `LruKReplacer`: LRU-K victim selection
//!   - `ReadPageGuard`/`WritePageGuard`: pin-for-lifetime page handles
//! - **Index** (`index`): ordered key access
//!   - `BPlusTree`: disk-paged B+tree with insertion, deletion and
//!     ordered iteration over the leaf chain
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strata::buffer::BufferPoolManager;
//! use strata::common::{PageId, RecordId, SlotId};
//! use strata::index::BPlusTree;
//! use strata::storage::disk::DiskManager;
//!
//! let disk = Arc::new(DiskManager::new("app.db").unwrap());
//! let bpm = Arc::new(BufferPoolManager::new(64, 2, disk));
//!
//! let mut tree: BPlusTree<u64, RecordId> =
//!     BPlusTree::new("orders_pk", Arc::clone(&bpm), 64, 64).unwrap();
//! tree.insert(&42, &RecordId::new(PageId::new(7), SlotId::new(0))).unwrap();
//! assert_eq!(tree.get_value(&42).unwrap().len(), 1);
//! ```

pub mod buffer;
pub mod common;
pub mod container;
pub mod index;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{FrameId, PageId, RecordId, Result, SlotId, StrataError};
