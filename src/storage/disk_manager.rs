//! Disk Manager - low-level page I/O.
//!
//! The buffer pool talks to storage only through the [`DiskManager`] trait.
//! [`FileDiskManager`] is the file-backed implementation: one OS file per
//! [`FileId`], pages laid out back to back.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, FileId, PageId, Result};

/// Raw page storage consumed by the buffer pool.
///
/// All buffers passed in are exactly [`PAGE_SIZE`] bytes. Errors are
/// treated as unrecoverable by the pool: they are propagated to the caller
/// and never retried.
pub trait DiskManager: Send {
    /// Fill `buf` with the persisted contents of `page_id`.
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()>;

    /// Persist `buf` as the contents of `page_id`.
    fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> Result<()>;

    /// Reserve a fresh page in `fd` and return its page number.
    fn allocate_page(&mut self, fd: FileId) -> Result<u32>;
}

struct DiskFile {
    file: File,
    path: PathBuf,
    /// Number of allocated pages in the file.
    page_count: u32,
}

impl DiskFile {
    fn check_bounds(&self, page_id: PageId) -> Result<()> {
        if page_id.page_no >= self.page_count {
            return Err(Error::PageOutOfBounds(page_id));
        }
        Ok(())
    }
}

/// Manages page I/O for a set of open database files.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// # Thread Safety
/// `FileDiskManager` is single-threaded (`&mut self` everywhere). The
/// buffer pool serializes access to it.
///
/// # Durability
/// Writes and allocations are followed by `fsync()`.
///
/// # Example
/// ```no_run
/// use pagecache::storage::{DiskManager, FileDiskManager};
///
/// let mut dm = FileDiskManager::new();
/// let fd = dm.open_file("table.db").unwrap();
/// let page_no = dm.allocate_page(fd).unwrap();
/// ```
#[derive(Default)]
pub struct FileDiskManager {
    files: HashMap<FileId, DiskFile>,
    next_fd: u32,
}

impl FileDiskManager {
    /// Create a disk manager with no open files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path`, creating it if it doesn't exist.
    ///
    /// Opening a path that is already open returns its existing id.
    pub fn open_file<P: AsRef<Path>>(&mut self, path: P) -> Result<FileId> {
        let path = path.as_ref();
        if let Some((&fd, _)) = self.files.iter().find(|(_, f)| f.path.as_path() == path) {
            return Ok(fd);
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let page_count = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;

        let fd = FileId::new(self.next_fd);
        self.next_fd += 1;
        debug!("opened {} as {} ({} pages)", path.display(), fd, page_count);

        self.files.insert(
            fd,
            DiskFile {
                file,
                path: path.to_path_buf(),
                page_count,
            },
        );
        Ok(fd)
    }

    /// Sync and close a file.
    pub fn close_file(&mut self, fd: FileId) -> Result<()> {
        let disk_file = self.files.remove(&fd).ok_or(Error::FileNotOpen(fd))?;
        disk_file.file.sync_all()?;
        debug!("closed {}", fd);
        Ok(())
    }

    /// Get the number of allocated pages in a file.
    pub fn page_count(&self, fd: FileId) -> Result<u32> {
        Ok(self.file(fd)?.page_count)
    }

    fn file(&self, fd: FileId) -> Result<&DiskFile> {
        self.files.get(&fd).ok_or(Error::FileNotOpen(fd))
    }

    fn file_mut(&mut self, fd: FileId) -> Result<&mut DiskFile> {
        self.files.get_mut(&fd).ok_or(Error::FileNotOpen(fd))
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&mut self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        let disk_file = self.file_mut(page_id.fd)?;
        disk_file.check_bounds(page_id)?;

        disk_file
            .file
            .seek(SeekFrom::Start(page_id.offset(PAGE_SIZE)))?;
        disk_file.file.read_exact(buf)?;
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, buf: &[u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        let disk_file = self.file_mut(page_id.fd)?;
        disk_file.check_bounds(page_id)?;

        disk_file
            .file
            .seek(SeekFrom::Start(page_id.offset(PAGE_SIZE)))?;
        disk_file.file.write_all(buf)?;
        disk_file.file.sync_all()?;
        Ok(())
    }

    fn allocate_page(&mut self, fd: FileId) -> Result<u32> {
        let disk_file = self.file_mut(fd)?;
        let page_id = PageId::new(fd, disk_file.page_count);

        // Extend the file with a zeroed page so reads of it succeed.
        disk_file
            .file
            .seek(SeekFrom::Start(page_id.offset(PAGE_SIZE)))?;
        disk_file.file.write_all(&[0u8; PAGE_SIZE])?;
        disk_file.file.sync_all()?;

        disk_file.page_count += 1;
        Ok(page_id.page_no)
    }
}
