//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds a [`Page`] plus the metadata the pool needs:
//! - Which page is loaded (if any)
//! - Pin count for reference counting
//! - Dirty flag for write-back tracking
//!
//! [`FrameRef`] is the pin-scoped handle the pool hands to callers.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

/// A frame in the buffer pool.
///
/// Frames are allocated once when the pool is built and recycled forever
/// after. Metadata uses interior mutability so the pool can share `&Frame`
/// with callers, but it is only ever changed while the pool latch is held.
/// The page bytes have their own reader/writer latch.
pub struct Frame {
    /// The page bytes.
    data: RwLock<Page>,

    /// Which page is currently loaded, or None if the frame is empty.
    page_id: Mutex<Option<PageId>>,

    /// Number of outstanding pins.
    pin_count: AtomicU32,

    /// Whether the bytes may differ from what's on disk.
    is_dirty: AtomicBool,
}

impl Frame {
    /// Create a new empty frame.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Page::new()),
            page_id: Mutex::new(None),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }

    /// Acquire the shared data latch.
    #[inline]
    pub fn data(&self) -> RwLockReadGuard<'_, Page> {
        self.data.read()
    }

    /// Acquire the exclusive data latch.
    #[inline]
    pub fn data_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.data.write()
    }

    /// Acquire the shared data latch if nobody holds it exclusively.
    #[inline]
    pub(crate) fn try_data(&self) -> Option<RwLockReadGuard<'_, Page>> {
        self.data.try_read()
    }

    /// Get the page ID of the loaded page.
    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        *self.page_id.lock()
    }

    #[inline]
    pub(crate) fn set_page_id(&self, page_id: Option<PageId>) {
        *self.page_id.lock() = page_id;
    }

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement the pin count. Returns the new pin count, or `None`
    /// (leaving the count untouched) if it was already zero.
    #[inline]
    pub(crate) fn unpin(&self) -> Option<u32> {
        self.pin_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .ok()
            .map(|old| old - 1)
    }

    /// Get the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    /// Check if the frame is currently pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    #[inline]
    pub(crate) fn mark_dirty(&self) {
        self.is_dirty.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn clear_dirty(&self) {
        self.is_dirty.store(false, Ordering::Relaxed);
    }

    /// Check if the frame is dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Relaxed)
    }

    /// Check if the frame is empty (no page loaded).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.page_id().is_none()
    }

    /// Zero the bytes and load `page_id` with clean, unpinned metadata.
    pub(crate) fn install(&self, page_id: Option<PageId>) {
        self.data_mut().reset();
        self.set_page_id(page_id);
        self.pin_count.store(0, Ordering::Relaxed);
        self.is_dirty.store(false, Ordering::Relaxed);
    }

    /// Return the frame to the empty state.
    pub(crate) fn reset(&self) {
        self.install(None);
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

/// A pinned page, as returned by [`BufferPoolManager::fetch_page`] and
/// [`BufferPoolManager::new_page`].
///
/// Each handle stands for exactly one pin, so it is neither `Clone` nor
/// `Copy`. It stays meaningful until the matching unpin; the pool never
/// repurposes a pinned frame. [`BufferPoolManager::unpin_frame`] consumes
/// the handle so it cannot outlive its pin. Data latches taken through it
/// must be dropped before unpinning.
///
/// ```compile_fail
/// use pagecache::buffer::BufferPoolManager;
/// use pagecache::storage::MemoryDiskManager;
///
/// let disk = MemoryDiskManager::new();
/// let fd = disk.create_file();
/// let bpm = BufferPoolManager::new(2, disk);
///
/// let page = bpm.new_page(fd).unwrap();
/// bpm.unpin_frame(page, false).unwrap();
/// let _ = page.data();
/// ```
///
/// [`BufferPoolManager::fetch_page`]: super::BufferPoolManager::fetch_page
/// [`BufferPoolManager::new_page`]: super::BufferPoolManager::new_page
/// [`BufferPoolManager::unpin_frame`]: super::BufferPoolManager::unpin_frame
pub struct FrameRef<'a> {
    frame: &'a Frame,
    frame_id: FrameId,
    page_id: PageId,
}

impl<'a> FrameRef<'a> {
    pub(crate) fn new(frame: &'a Frame, frame_id: FrameId, page_id: PageId) -> Self {
        Self {
            frame,
            frame_id,
            page_id,
        }
    }

    /// The pinned page.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// The frame holding it.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Shared access to the page bytes.
    #[inline]
    pub fn data(&self) -> RwLockReadGuard<'a, Page> {
        self.frame.data()
    }

    /// Exclusive access to the page bytes.
    ///
    /// Writing does not mark the page dirty; pass `is_dirty = true` to
    /// `unpin_page` for that.
    #[inline]
    pub fn data_mut(&self) -> RwLockWriteGuard<'a, Page> {
        self.frame.data_mut()
    }
}
