//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache between page users and disk. It
//! manages a fixed pool of frames, each holding at most one page.
//!
//! # Components
//! - [`BufferPoolManager`] - The fetch/new/unpin/flush/delete protocol
//! - [`Frame`] / [`FrameRef`] - A pool slot and the pinned handle to it
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII guards for page access
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - Replacement policy implementations

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::{Frame, FrameRef};
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use stats::{BufferPoolStats, StatsSnapshot};
