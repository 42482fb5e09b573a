//! pagecache - a buffer pool page cache with pluggable replacement policies.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │            Callers (record layer, indexes, tests)               │
//! │      fetch_page / new_page / unpin_page / flush / delete        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │               Buffer Pool (buffer/)                      │   │
//! │  │   BufferPoolManager + Frame + FrameRef + Statistics      │   │
//! │  │   ┌─────────────────────────────────────────────────┐   │   │
//! │  │   │  Replacement policies: LRU | CLOCK              │   │   │
//! │  │   │        (chosen at construction)                 │   │   │
//! │  │   └─────────────────────────────────────────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │               Storage Layer (storage/)                   │   │
//! │  │   DiskManager trait: FileDiskManager | MemoryDiskManager │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FileId, FrameId, Error, config)
//! - [`buffer`] - Buffer pool management and replacement policies
//! - [`storage`] - Disk I/O and the page type
//!
//! # Quick Start
//! ```no_run
//! use pagecache::storage::FileDiskManager;
//! use pagecache::BufferPoolManager;
//!
//! let mut dm = FileDiskManager::new();
//! let fd = dm.open_file("my_table.db").unwrap();
//! let bpm = BufferPoolManager::new(64, dm);
//!
//! let mut guard = bpm.new_page_guarded(fd).unwrap();
//! guard.as_mut_slice()[0] = 0xAB;
//! drop(guard);
//!
//! bpm.flush_all_pages(fd).unwrap();
//! ```
//!
//! # Logging
//! The crate logs through the [`log`] facade and installs no logger.

pub mod buffer;
pub mod common;
pub mod storage;

pub use common::config::{DEFAULT_POOL_SIZE, PAGE_SIZE};
pub use common::{BufferPoolConfig, Error, FileId, FrameId, PageId, Result};

pub use buffer::{BufferPoolManager, BufferPoolStats, FrameRef, StatsSnapshot};
pub use storage::{DiskManager, Page};
