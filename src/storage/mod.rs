//! Storage layer - disk I/O and the page type.
//!
//! - [`DiskManager`] - The page I/O interface the buffer pool consumes
//! - [`FileDiskManager`] - File-backed implementation
//! - [`MemoryDiskManager`] - In-memory implementation with inspection hooks
//! - [`Page`] - The raw 4KB data container

mod disk_manager;
mod memory_disk_manager;
pub mod page;

pub use disk_manager::{DiskManager, FileDiskManager};
pub use memory_disk_manager::MemoryDiskManager;
pub use page::Page;
