//! Error types for the page cache.

use thiserror::Error;

use super::{FileId, PageId};

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors surfaced by the buffer pool and the disk managers.
///
/// Buffer pool failures (`PoolExhausted`, `PageNotFound`, `PagePinned`,
/// `OverRelease`) are reported before any state is mutated. Disk-level
/// failures are passed through from the [`DiskManager`] untouched; the pool
/// never retries them.
///
/// [`DiskManager`]: crate::storage::DiskManager
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Every frame is pinned: nothing is free and nothing can be evicted.
    #[error("buffer pool exhausted: all frames are pinned")]
    PoolExhausted,

    /// The page is not resident in the buffer pool.
    #[error("{0} is not resident in the buffer pool")]
    PageNotFound(PageId),

    /// The page is still in use and cannot be deleted.
    #[error("{0} is pinned")]
    PagePinned(PageId),

    /// Unpin requested for a page whose pin count is already zero.
    #[error("{0} is not pinned")]
    OverRelease(PageId),

    /// The disk manager has no open file with this id.
    #[error("{0} is not open")]
    FileNotOpen(FileId),

    /// The page was never allocated in its file.
    #[error("{0} is beyond the end of its file")]
    PageOutOfBounds(PageId),

    /// A configuration value was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(PageId::new(FileId(1), 42));
        assert_eq!(
            format!("{}", err),
            "Page(1:42) is not resident in the buffer pool"
        );

        let err = Error::PoolExhausted;
        assert_eq!(
            format!("{}", err),
            "buffer pool exhausted: all frames are pinned"
        );

        let err = Error::OverRelease(PageId::new(FileId(0), 3));
        assert_eq!(format!("{}", err), "Page(0:3) is not pinned");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        assert!(matches!(err, Error::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
