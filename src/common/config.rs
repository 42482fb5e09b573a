//! Configuration for the page cache.

use crate::buffer::replacer::ReplacerKind;
use crate::common::{Error, Result};

/// Size of a page in bytes (4KB).
///
/// Every frame buffer and every disk transfer is exactly this size.
/// Pages are aligned to 4096 bytes for efficient Direct I/O (O_DIRECT).
pub const PAGE_SIZE: usize = 4096;

/// Number of frames used when no pool size is given.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Construction-time settings for a [`BufferPoolManager`].
///
/// # Example
/// ```
/// use pagecache::BufferPoolConfig;
/// use pagecache::buffer::replacer::ReplacerKind;
///
/// let config = BufferPoolConfig::default()
///     .pool_size(16)
///     .replacer(ReplacerKind::Clock);
/// assert!(config.validate().is_ok());
/// ```
///
/// [`BufferPoolManager`]: crate::buffer::BufferPoolManager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub pool_size: usize,
    /// Replacement policy used to pick victims.
    pub replacer: ReplacerKind,
}

impl BufferPoolConfig {
    /// Set the number of frames.
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Set the replacement policy.
    pub fn replacer(mut self, replacer: ReplacerKind) -> Self {
        self.replacer = replacer;
        self
    }

    /// Check that the configuration describes a usable pool.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig("pool_size must be > 0".into()));
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            replacer: ReplacerKind::Lru,
        }
    }
}
