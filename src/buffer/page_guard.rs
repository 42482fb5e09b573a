//! RAII guards for page access.
//!
//! - [`PageReadGuard`] - Shared access (many at once)
//! - [`PageWriteGuard`] - Exclusive access, marks the page dirty
//!
//! A guard holds one pin and the page's data latch. On drop it releases the
//! latch first and then unpins, so it never waits on the pool latch while
//! holding a data latch.
//!
//! A thread holding a guard must flush that page through the guard's
//! `flush`, never through [`BufferPoolManager::flush_page`], which would wait
//! on the latch the thread itself holds.

use std::ops::{Deref, DerefMut};

use log::error;
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use super::buffer_pool_manager::BufferPoolManager;
use super::frame::FrameRef;
use crate::common::{FrameId, PageId, Result};
use crate::storage::page::Page;

/// Guard for read-only page access.
///
/// # Example
/// ```
/// use pagecache::buffer::BufferPoolManager;
/// use pagecache::storage::MemoryDiskManager;
///
/// let disk = MemoryDiskManager::new();
/// let fd = disk.create_file();
/// let bpm = BufferPoolManager::new(4, disk);
/// let page_id = bpm.new_page_guarded(fd).unwrap().page_id();
///
/// let guard = bpm.fetch_page_read(page_id).unwrap();
/// assert_eq!(guard.as_slice()[0], 0);
/// assert_eq!(bpm.pin_count(page_id), Some(1));
/// drop(guard);
/// assert_eq!(bpm.pin_count(page_id), Some(0));
/// ```
pub struct PageReadGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    /// `None` only while dropping.
    latch: Option<RwLockReadGuard<'a, Page>>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, frame: FrameRef<'a>) -> Self {
        Self {
            bpm,
            frame_id: frame.frame_id(),
            page_id: frame.page_id(),
            latch: Some(frame.data()),
        }
    }

    /// Get the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Get the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Write the page to disk without giving up the guard.
    pub fn flush(&self) -> Result<()> {
        self.bpm.flush_latched(self.page_id, self)
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        self.latch.as_deref().expect("page latch released before drop")
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.latch.take();
        release(self.bpm, self.page_id, false);
    }
}

/// Guard for exclusive write access to a page.
///
/// The page is marked dirty when the guard drops, unless it was flushed
/// through [`flush`](Self::flush) and not mutably borrowed since.
///
/// # Example
/// ```
/// use pagecache::buffer::BufferPoolManager;
/// use pagecache::storage::MemoryDiskManager;
///
/// let disk = MemoryDiskManager::new();
/// let fd = disk.create_file();
/// let bpm = BufferPoolManager::new(4, disk.clone());
///
/// let mut guard = bpm.new_page_guarded(fd).unwrap();
/// let page_id = guard.page_id();
/// guard.as_mut_slice()[0] = 0xFF;
/// guard.flush().unwrap();
/// assert_eq!(disk.page_bytes(page_id).unwrap()[0], 0xFF);
///
/// guard.as_mut_slice()[1] = 0xEE;
/// drop(guard);
/// assert_eq!(bpm.is_dirty(page_id), Some(true));
/// ```
pub struct PageWriteGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    /// Whether the page must be marked dirty on drop.
    dirty: bool,
    /// `None` only while dropping.
    latch: Option<RwLockWriteGuard<'a, Page>>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, frame: FrameRef<'a>) -> Self {
        Self {
            bpm,
            frame_id: frame.frame_id(),
            page_id: frame.page_id(),
            dirty: true,
            latch: Some(frame.data_mut()),
        }
    }

    /// Get the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Get the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Write the page to disk without giving up the guard.
    ///
    /// On success the page is clean until the next mutable access.
    pub fn flush(&mut self) -> Result<()> {
        let page = self
            .latch
            .as_deref()
            .expect("page latch released before drop");
        self.bpm.flush_latched(self.page_id, page)?;
        self.dirty = false;
        Ok(())
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        self.latch.as_deref().expect("page latch released before drop")
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        self.dirty = true;
        self.latch
            .as_deref_mut()
            .expect("page latch released before drop")
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.latch.take();
        release(self.bpm, self.page_id, self.dirty);
    }
}

fn release(bpm: &BufferPoolManager, page_id: PageId, is_dirty: bool) {
    // A guard owns exactly one pin, so this only fails on pool misuse.
    if let Err(e) = bpm.unpin_page(page_id, is_dirty) {
        error!("guard for {} failed to unpin: {}", page_id, e);
    }
}
