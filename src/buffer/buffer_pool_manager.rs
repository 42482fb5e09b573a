//! Buffer Pool Manager - the core page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory
//! - Pin-based reference counting
//! - Dirty page write-back before any frame is reused
//! - Pluggable replacement policies

use std::collections::{HashMap, VecDeque};

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::buffer::replacer::{LruReplacer, Replacer};
use crate::buffer::{BufferPoolStats, Frame, FrameRef, PageReadGuard, PageWriteGuard};
use crate::common::{BufferPoolConfig, Error, FileId, FrameId, PageId, Result};
use crate::storage::{DiskManager, Page};

/// State guarded by the pool latch.
struct PoolState {
    /// Maps resident pages to the frame holding them.
    page_table: HashMap<PageId, FrameId>,

    /// Frames holding no page, handed out front first.
    free_list: VecDeque<FrameId>,

    /// Handles all disk I/O.
    disk_manager: Box<dyn DiskManager>,
}

/// Manages a fixed pool of frames caching disk pages.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  latch: Mutex<PoolState>                                    │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐       │
/// │  │ page_table   │  │  free_list   │  │disk_manager  │       │
/// │  │PageId → Fid  │  │VecDeque<Fid> │  │dyn DiskMgr   │       │
/// │  └──────┬───────┘  └──────────────┘  └──────────────┘       │
/// │         ▼                                                   │
/// │  frames: Vec<Frame>  [Frame0] [Frame1] [Frame2] ...         │
/// │  replacer: Box<dyn Replacer>   (own internal lock)          │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Frame states
/// Outside any call, every frame is in exactly one of:
/// - the free list (no page loaded),
/// - the replacer (page loaded, pin count 0),
/// - pinned (page loaded, pin count > 0).
///
/// # Thread Safety
/// Every operation runs under one pool-wide latch, including its disk I/O.
/// The replacer is always entered while holding that latch, never the other
/// way round. Page bytes have per-frame data latches; the pool only waits
/// on a data latch while holding the pool latch for frames nobody has
/// pinned, and `flush_page` backs off instead of waiting when a caller
/// holds the page exclusively.
///
/// # Usage
/// ```
/// use pagecache::buffer::BufferPoolManager;
/// use pagecache::storage::MemoryDiskManager;
///
/// let disk = MemoryDiskManager::new();
/// let fd = disk.create_file();
/// let bpm = BufferPoolManager::new(10, disk);
///
/// let page = bpm.new_page(fd).unwrap();
/// page.data_mut().as_mut_slice()[0] = 0xAB;
/// let page_id = page.page_id();
/// bpm.unpin_page(page_id, true).unwrap();
///
/// let page = bpm.fetch_page(page_id).unwrap();
/// assert_eq!(page.data().as_slice()[0], 0xAB);
/// bpm.unpin_page(page_id, false).unwrap();
/// ```
pub struct BufferPoolManager {
    /// Fixed pool of frames allocated at startup.
    frames: Vec<Frame>,

    latch: Mutex<PoolState>,

    /// Eviction policy for selecting victim frames.
    replacer: Box<dyn Replacer>,

    stats: BufferPoolStats,
}

impl BufferPoolManager {
    /// Create a pool of `pool_size` frames using LRU replacement.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: impl DiskManager + 'static) -> Self {
        Self::with_replacer(
            pool_size,
            disk_manager,
            Box::new(LruReplacer::new(pool_size)),
        )
    }

    /// Create a pool from a validated configuration.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` if the configuration is rejected
    pub fn with_config(
        config: BufferPoolConfig,
        disk_manager: impl DiskManager + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let replacer = config.replacer.build(config.pool_size);
        Ok(Self::with_replacer(config.pool_size, disk_manager, replacer))
    }

    /// Create a pool with a caller-supplied replacer.
    ///
    /// The replacer must accept frame ids in `0..pool_size`.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn with_replacer(
        pool_size: usize,
        disk_manager: impl DiskManager + 'static,
        replacer: Box<dyn Replacer>,
    ) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames = (0..pool_size).map(|_| Frame::new()).collect();
        let free_list = (0..pool_size).map(FrameId::new).collect();
        debug!("buffer pool created with {} frames", pool_size);

        Self {
            frames,
            latch: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(pool_size),
                free_list,
                disk_manager: Box::new(disk_manager),
            }),
            replacer,
            stats: BufferPoolStats::new(),
        }
    }

    // ========================================================================
    // Public API: Pin protocol
    // ========================================================================

    /// Pin a page, reading it from disk if it isn't resident.
    ///
    /// Every successful call must be matched by one [`unpin_page`].
    ///
    /// # Errors
    /// - `Error::PoolExhausted` if the page is not resident and every frame
    ///   is pinned
    /// - Disk errors from writing back the victim or reading the page
    ///
    /// [`unpin_page`]: Self::unpin_page
    pub fn fetch_page(&self, page_id: PageId) -> Result<FrameRef<'_>> {
        let mut state = self.latch.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.stats.record_hit();
            return Ok(self.pin_frame(frame_id, page_id));
        }

        self.stats.record_miss();
        let frame_id = self.find_victim_frame(&mut state)?;
        self.reinstall_frame(&mut state, frame_id, page_id)?;

        let frame = &self.frames[frame_id.0];
        let read = state
            .disk_manager
            .read_page(page_id, frame.data_mut().as_mut_slice());
        if let Err(e) = read {
            // The frame never really held the page; hand it back empty.
            state.page_table.remove(&page_id);
            frame.reset();
            state.free_list.push_front(frame_id);
            return Err(e);
        }
        self.stats.record_read();
        debug!("loaded {} into {}", page_id, frame_id);

        Ok(self.pin_frame(frame_id, page_id))
    }

    /// Allocate a new page in `fd` and pin it.
    ///
    /// The page starts zeroed in memory; nothing is read from disk.
    ///
    /// # Errors
    /// - `Error::PoolExhausted` if every frame is pinned
    /// - Disk errors from allocation or from writing back the victim
    pub fn new_page(&self, fd: FileId) -> Result<FrameRef<'_>> {
        let mut state = self.latch.lock();

        let frame_id = self.find_victim_frame(&mut state)?;
        let page_no = match state.disk_manager.allocate_page(fd) {
            Ok(page_no) => page_no,
            Err(e) => {
                self.release_victim(&mut state, frame_id);
                return Err(e);
            }
        };

        let page_id = PageId::new(fd, page_no);
        self.reinstall_frame(&mut state, frame_id, page_id)?;
        debug!("created {} in {}", page_id, frame_id);

        Ok(self.pin_frame(frame_id, page_id))
    }

    /// Release one pin on a page.
    ///
    /// `is_dirty = true` marks the page dirty; `false` never clears an
    /// earlier mark. When the last pin goes the frame becomes evictable.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page is not resident
    /// - `Error::OverRelease` if the page has no outstanding pins
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<()> {
        let state = self.latch.lock();

        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(Error::PageNotFound(page_id))?;
        let frame = &self.frames[frame_id.0];

        let remaining = frame.unpin().ok_or(Error::OverRelease(page_id))?;
        if remaining == 0 {
            self.replacer.unpin(frame_id);
        }
        if is_dirty {
            frame.mark_dirty();
        }

        trace!("unpinned {} (pins left: {})", page_id, remaining);
        Ok(())
    }

    /// Release the pin held by `frame`, consuming the handle.
    ///
    /// Same as [`unpin_page`](Self::unpin_page), but the borrow of the page
    /// ends together with the pin.
    pub fn unpin_frame(&self, frame: FrameRef<'_>, is_dirty: bool) -> Result<()> {
        self.unpin_page(frame.page_id(), is_dirty)
    }

    /// Write a resident page to disk, dirty or not, pinned or not.
    ///
    /// Pin count, residency and eviction order are left untouched.
    ///
    /// The calling thread must not hold the page's data latch: a thread
    /// holding a guard on the page flushes through [`PageWriteGuard::flush`]
    /// or [`PageReadGuard::flush`] instead. Latches held by other threads are
    /// waited for without holding the pool latch.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page is not resident
    /// - Disk errors from the write
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        loop {
            let mut state = self.latch.lock();

            let frame_id = *state
                .page_table
                .get(&page_id)
                .ok_or(Error::PageNotFound(page_id))?;
            let frame = &self.frames[frame_id.0];

            match frame.try_data() {
                Some(page) => return self.write_resident(&mut state, frame_id, page_id, &page),
                None => {
                    // A pinner holds the bytes exclusively. Wait for it
                    // without the pool latch, then look the page up again.
                    drop(state);
                    drop(frame.data());
                }
            }
        }
    }

    /// Remove a page from the pool and free its frame.
    ///
    /// The page's bytes are written back first. Deleting a page that isn't
    /// resident succeeds without doing anything.
    ///
    /// # Errors
    /// - `Error::PagePinned` if the page is in use
    /// - Disk errors from the write-back
    pub fn delete_page(&self, page_id: PageId) -> Result<()> {
        let mut state = self.latch.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(());
        };
        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            return Err(Error::PagePinned(page_id));
        }

        {
            let page = frame.data();
            state.disk_manager.write_page(page_id, page.as_slice())?;
        }
        self.stats.record_write();

        // An unpinned resident frame is always in the replacer.
        self.replacer.pin(frame_id);
        state.page_table.remove(&page_id);
        frame.reset();
        state.free_list.push_back(frame_id);

        debug!("deleted {} from {}", page_id, frame_id);
        Ok(())
    }

    /// Flush every resident page of `fd`.
    ///
    /// Pages are flushed one at a time; a page evicted while this runs was
    /// written back by its eviction and is skipped. The calling thread must
    /// not hold a data latch on any page of `fd` (see [`flush_page`]).
    ///
    /// [`flush_page`]: Self::flush_page
    ///
    /// # Errors
    /// - Disk errors from any write; pages after the failing one are not
    ///   flushed
    pub fn flush_all_pages(&self, fd: FileId) -> Result<()> {
        let mut targets: Vec<PageId> = {
            let state = self.latch.lock();
            state
                .page_table
                .keys()
                .filter(|page_id| page_id.fd == fd)
                .copied()
                .collect()
        };
        targets.sort_unstable();

        for page_id in targets {
            match self.flush_page(page_id) {
                Ok(()) | Err(Error::PageNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        debug!("flushed all pages of {}", fd);
        Ok(())
    }

    /// Flush a page whose data latch the caller already holds.
    pub(crate) fn flush_latched(&self, page_id: PageId, page: &Page) -> Result<()> {
        let mut state = self.latch.lock();
        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(Error::PageNotFound(page_id))?;
        self.write_resident(&mut state, frame_id, page_id, page)
    }

    // ========================================================================
    // Public API: Guarded access
    // ========================================================================

    /// Fetch a page and hold it for reading until the guard drops.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame = self.fetch_page(page_id)?;
        Ok(PageReadGuard::new(self, frame))
    }

    /// Fetch a page and hold it for writing until the guard drops.
    ///
    /// The page is marked dirty when the guard drops.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame = self.fetch_page(page_id)?;
        Ok(PageWriteGuard::new(self, frame))
    }

    /// Allocate a new page in `fd` and hold it for writing.
    pub fn new_page_guarded(&self, fd: FileId) -> Result<PageWriteGuard<'_>> {
        let frame = self.new_page(fd)?;
        Ok(PageWriteGuard::new(self, frame))
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Get buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Get the pool size.
    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    /// Get the number of frames on the free list.
    pub fn free_frame_count(&self) -> usize {
        self.latch.lock().free_list.len()
    }

    /// Get the number of resident pages.
    pub fn page_count(&self) -> usize {
        self.latch.lock().page_table.len()
    }

    /// Get the number of frames the replacer may evict.
    pub fn evictable_count(&self) -> usize {
        let _state = self.latch.lock();
        self.replacer.size()
    }

    /// Pin count of a resident page, or `None` if it isn't resident.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.latch.lock();
        let frame_id = state.page_table.get(&page_id)?;
        Some(self.frames[frame_id.0].pin_count())
    }

    /// Dirty flag of a resident page, or `None` if it isn't resident.
    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let state = self.latch.lock();
        let frame_id = state.page_table.get(&page_id)?;
        Some(self.frames[frame_id.0].is_dirty())
    }

    // ========================================================================
    // Internal: Frame allocation and reuse
    // ========================================================================

    /// Add a pin to a resident frame.
    fn pin_frame(&self, frame_id: FrameId, page_id: PageId) -> FrameRef<'_> {
        let frame = &self.frames[frame_id.0];
        self.replacer.pin(frame_id);
        let pins = frame.pin();
        trace!("pinned {} in {} (pins: {})", page_id, frame_id, pins);
        FrameRef::new(frame, frame_id, page_id)
    }

    /// Take a frame from the free list, or else ask the replacer.
    fn find_victim_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }
        self.replacer.victim().ok_or_else(|| {
            warn!("buffer pool exhausted: all {} frames pinned", self.frames.len());
            Error::PoolExhausted
        })
    }

    /// Write the bytes of a resident page and mark it clean.
    fn write_resident(
        &self,
        state: &mut PoolState,
        frame_id: FrameId,
        page_id: PageId,
        page: &Page,
    ) -> Result<()> {
        state.disk_manager.write_page(page_id, page.as_slice())?;
        self.frames[frame_id.0].clear_dirty();
        self.stats.record_write();
        trace!("flushed {}", page_id);
        Ok(())
    }

    /// Put back a victim that ended up unused, where it was taken from.
    fn release_victim(&self, state: &mut PoolState, frame_id: FrameId) {
        if self.frames[frame_id.0].is_empty() {
            state.free_list.push_front(frame_id);
        } else {
            self.replacer.restore(frame_id);
        }
    }

    /// Repurpose `frame_id` to hold `page_id`.
    ///
    /// Writes back the old page if dirty, moves the page table entry, and
    /// leaves the frame zeroed, clean and unpinned. If the write-back
    /// fails nothing changes and the victim goes back where it came from.
    fn reinstall_frame(
        &self,
        state: &mut PoolState,
        frame_id: FrameId,
        page_id: PageId,
    ) -> Result<()> {
        let frame = &self.frames[frame_id.0];

        if let Some(old_page_id) = frame.page_id() {
            if frame.is_dirty() {
                let written = {
                    let page = frame.data();
                    state.disk_manager.write_page(old_page_id, page.as_slice())
                };
                if let Err(e) = written {
                    self.release_victim(state, frame_id);
                    return Err(e);
                }
                frame.clear_dirty();
                self.stats.record_write();
            }
            state.page_table.remove(&old_page_id);
            self.stats.record_eviction();
            debug!("evicted {} from {}", old_page_id, frame_id);
        }

        state.page_table.insert(page_id, frame_id);
        frame.install(Some(page_id));
        Ok(())
    }
}
