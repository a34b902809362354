use thiserror::Error;

use super::types::PageId;

/// Errors surfaced at the storage-core boundary
#[derive(Error, Debug)]
pub enum StrataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("buffer pool exhausted: every frame is pinned")]
    PoolExhausted,

    #[error("page {0} not found")]
    PageNotFound(PageId),

    #[error("invalid page ID: {0}")]
    InvalidPageId(PageId),

    #[error("disk scheduler error: {0}")]
    DiskScheduler(String),

    #[error("index corrupted: {0}")]
    IndexCorrupted(String),

    #[error("invalid index name: {0}")]
    InvalidIndexName(String),
}

pub type Result<T> = std::result::Result<T, StrataError>;
