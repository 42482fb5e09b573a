//! In-memory disk manager.
//!
//! [`MemoryDiskManager`] keeps pages in RAM and records every transfer, so
//! tests can check exactly what the buffer pool persisted and when.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, FileId, PageId, Result};
use crate::storage::page::Page;
use crate::storage::DiskManager;

#[derive(Default)]
struct MemoryStore {
    files: HashMap<FileId, Vec<Box<Page>>>,
    next_fd: u32,
    reads: u64,
    writes: u64,
    writes_per_page: HashMap<PageId, u64>,
    fail_writes: bool,
}

impl MemoryStore {
    fn page(&self, page_id: PageId) -> Result<&Page> {
        let file = self
            .files
            .get(&page_id.fd)
            .ok_or(Error::FileNotOpen(page_id.fd))?;
        file.get(page_id.page_no as usize)
            .map(|p| p.as_ref())
            .ok_or(Error::PageOutOfBounds(page_id))
    }

    fn page_mut(&mut self, page_id: PageId) -> Result<&mut Page> {
        let file = self
            .files
            .get_mut(&page_id.fd)
            .ok_or(Error::FileNotOpen(page_id.fd))?;
        file.get_mut(page_id.page_no as usize)
            .map(|p| p.as_mut())
            .ok_or(Error::PageOutOfBounds(page_id))
    }
}

/// A purely in-memory [`DiskManager`].
///
/// Clones share the same storage, so a test can hand one clone to the
/// buffer pool and keep another for inspection.
///
/// # Example
/// ```
/// use pagecache::storage::{DiskManager, MemoryDiskManager};
/// use pagecache::PageId;
///
/// let disk = MemoryDiskManager::new();
/// let fd = disk.create_file();
///
/// let mut handle = disk.clone();
/// let page_no = handle.allocate_page(fd).unwrap();
/// assert_eq!(disk.page_count(fd), Some(1));
/// assert_eq!(disk.page_bytes(PageId::new(fd, page_no)).unwrap()[0], 0);
/// ```
#[derive(Clone, Default)]
pub struct MemoryDiskManager {
    store: Arc<Mutex<MemoryStore>>,
}

impl MemoryDiskManager {
    /// Create an empty in-memory disk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty file and return its id.
    pub fn create_file(&self) -> FileId {
        let mut store = self.store.lock();
        let fd = FileId::new(store.next_fd);
        store.next_fd += 1;
        store.files.insert(fd, Vec::new());
        fd
    }

    /// Number of allocated pages in `fd`, or `None` if it doesn't exist.
    pub fn page_count(&self, fd: FileId) -> Option<u32> {
        self.store.lock().files.get(&fd).map(|f| f.len() as u32)
    }

    /// Copy of the persisted bytes of a page.
    pub fn page_bytes(&self, page_id: PageId) -> Option<Vec<u8>> {
        let store = self.store.lock();
        store.page(page_id).ok().map(|p| p.as_slice().to_vec())
    }

    /// Total number of page reads served.
    pub fn reads(&self) -> u64 {
        self.store.lock().reads
    }

    /// Total number of page writes accepted.
    pub fn writes(&self) -> u64 {
        self.store.lock().writes
    }

    /// Number of writes accepted for one page.
    pub fn writes_to(&self, page_id: PageId) -> u64 {
        let store = self.store.lock();
        store.writes_per_page.get(&page_id).copied().unwrap_or(0)
    }

    /// Make every subsequent write fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.store.lock().fail_writes = fail;
    }
}

impl DiskManager for MemoryDiskManager {
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        let mut store = self.store.lock();
        buf.copy_from_slice(store.page(page_id)?.as_slice());
        store.reads += 1;
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> Result<()> {
        let mut store = self.store.lock();
        if store.fail_writes {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure").into());
        }
        store.page_mut(page_id)?.copy_from(buf);
        store.writes += 1;
        *store.writes_per_page.entry(page_id).or_insert(0) += 1;
        Ok(())
    }

    fn allocate_page(&mut self, fd: FileId) -> Result<u32> {
        let mut store = self.store.lock();
        let file = store.files.get_mut(&fd).ok_or(Error::FileNotOpen(fd))?;
        file.push(Box::new(Page::new()));
        Ok((file.len() - 1) as u32)
    }
}
