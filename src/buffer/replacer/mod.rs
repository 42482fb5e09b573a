//! Replacement policies (replacers).
//!
//! A replacer tracks which frames are currently evictable and in what
//! order. It only learns about frames through [`Replacer::unpin`] and
//! forgets them through [`Replacer::pin`] or [`Replacer::victim`]; it never
//! looks at pin counts itself.
//!
//! Implementations:
//! - [`LruReplacer`] - Least recently unpinned is evicted first
//! - [`ClockReplacer`] - Second-chance sweep over a reference bit ring

mod clock;
mod lru;

pub use clock::ClockReplacer;
pub use lru::LruReplacer;

use crate::common::FrameId;

/// Eviction policy used by the buffer pool.
///
/// Every method takes `&self`; implementations guard their state with
/// their own lock. The pool always calls in while holding its own latch,
/// and replacers never call back into the pool.
pub trait Replacer: Send + Sync {
    /// Remove and return the frame to evict next, or `None` if no frame is
    /// evictable.
    fn victim(&self) -> Option<FrameId>;

    /// The frame is in use again: stop considering it for eviction.
    /// No-op if the frame isn't tracked.
    fn pin(&self, frame_id: FrameId);

    /// The frame's pin count reached zero: make it evictable.
    /// No-op if the frame is already tracked.
    fn unpin(&self, frame_id: FrameId);

    /// Hand back a frame just returned by [`victim`](Self::victim) that the
    /// caller could not use. It becomes the next victim again, as if
    /// `victim` had never been called.
    fn restore(&self, frame_id: FrameId);

    /// Number of evictable frames.
    fn size(&self) -> usize;
}

/// Selects a built-in replacer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReplacerKind {
    /// [`LruReplacer`].
    #[default]
    Lru,
    /// [`ClockReplacer`].
    Clock,
}

impl ReplacerKind {
    /// Build a replacer able to track `num_frames` frames.
    pub fn build(self, num_frames: usize) -> Box<dyn Replacer> {
        match self {
            ReplacerKind::Lru => Box::new(LruReplacer::new(num_frames)),
            ReplacerKind::Clock => Box::new(ClockReplacer::new(num_frames)),
        }
    }
}
