//! Page and file identifier types.

use std::fmt;

/// Identifies an open file known to the disk manager.
///
/// # Example
/// ```
/// use pagecache::FileId;
///
/// let fd = FileId::new(3);
/// assert_eq!(fd.0, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    /// Create a new FileId.
    #[inline]
    pub fn new(id: u32) -> Self {
        FileId(id)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File({})", self.0)
    }
}

/// Identifies a page on disk: the file it lives in plus its page number.
///
/// Equality and hashing are structural, so `(fd, page_no)` is the key of
/// the buffer pool's page table. There is no sentinel value; code that
/// needs "no page" uses `Option<PageId>`.
///
/// # Example
/// ```
/// use pagecache::{FileId, PageId};
///
/// let page_id = PageId::new(FileId::new(1), 42);
/// assert_eq!(page_id.fd, FileId::new(1));
/// assert_eq!(page_id.page_no, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    /// File the page belongs to.
    pub fd: FileId,
    /// Page number within the file.
    pub page_no: u32,
}

impl PageId {
    /// Create a new PageId.
    #[inline]
    pub fn new(fd: FileId, page_no: u32) -> Self {
        PageId { fd, page_no }
    }

    /// Byte offset of this page within its file.
    #[inline]
    pub fn offset(&self, page_size: usize) -> u64 {
        self.page_no as u64 * page_size as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({}:{})", self.fd.0, self.page_no)
    }
}
