mod bplus_tree;
mod index_iterator;
mod index_key;
mod internal_page;
mod leaf_page;
mod tree_page;

pub use bplus_tree::BPlusTree;
pub use index_iterator::IndexIterator;
pub use index_key::{IndexKey, IndexValue};
pub use internal_page::{InternalPage, InternalPageRef};
pub use leaf_page::{LeafPage, LeafPageRef};
pub use tree_page::TreePageType;
