//! LRU (Least Recently Unpinned) replacement policy.

use parking_lot::Mutex;

use super::Replacer;
use crate::common::FrameId;

#[derive(Debug, Default, Clone, Copy)]
struct Node {
    prev: Option<usize>,
    next: Option<usize>,
    linked: bool,
}

/// Doubly-linked list threaded through an arena indexed by frame id.
///
/// `head` is the most recently unpinned frame, `tail` the least recently
/// unpinned one. The arena doubles as the frame → node map, so every
/// operation is O(1).
#[derive(Debug)]
struct LruList {
    nodes: Vec<Node>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl LruList {
    fn new(capacity: usize) -> Self {
        Self {
            nodes: vec![Node::default(); capacity],
            head: None,
            tail: None,
            len: 0,
        }
    }

    fn contains(&self, idx: usize) -> bool {
        self.nodes.get(idx).is_some_and(|n| n.linked)
    }

    fn push_front(&mut self, idx: usize) {
        self.nodes[idx] = Node {
            prev: None,
            next: self.head,
            linked: true,
        };
        match self.head {
            Some(old_head) => self.nodes[old_head].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
        self.len += 1;
    }

    fn unlink(&mut self, idx: usize) {
        let Node { prev, next, .. } = self.nodes[idx];
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        self.nodes[idx] = Node::default();
        self.len -= 1;
    }

    fn push_back(&mut self, idx: usize) {
        self.nodes[idx] = Node {
            prev: self.tail,
            next: None,
            linked: true,
        };
        match self.tail {
            Some(old_tail) => self.nodes[old_tail].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.len += 1;
    }

    fn pop_back(&mut self) -> Option<usize> {
        let idx = self.tail?;
        self.unlink(idx);
        Some(idx)
    }
}

/// Evicts the frame that became evictable longest ago.
///
/// Ordering is by the moment a frame was last unpinned, not by when it was
/// last read: a frame that is pinned and unpinned again goes to the back of
/// the line.
///
/// # Example
/// ```
/// use pagecache::buffer::replacer::{LruReplacer, Replacer};
/// use pagecache::FrameId;
///
/// let lru = LruReplacer::new(3);
/// lru.unpin(FrameId(2));
/// lru.unpin(FrameId(0));
/// assert_eq!(lru.victim(), Some(FrameId(2)));
/// ```
#[derive(Debug)]
pub struct LruReplacer {
    list: Mutex<LruList>,
}

impl LruReplacer {
    /// Create a replacer for frames `0..num_frames`.
    pub fn new(num_frames: usize) -> Self {
        Self {
            list: Mutex::new(LruList::new(num_frames)),
        }
    }
}

impl Replacer for LruReplacer {
    fn victim(&self) -> Option<FrameId> {
        self.list.lock().pop_back().map(FrameId)
    }

    fn pin(&self, frame_id: FrameId) {
        let mut list = self.list.lock();
        if list.contains(frame_id.0) {
            list.unlink(frame_id.0);
        }
    }

    fn unpin(&self, frame_id: FrameId) {
        let mut list = self.list.lock();
        assert!(
            frame_id.0 < list.nodes.len(),
            "{} out of range for replacer of {} frames",
            frame_id,
            list.nodes.len()
        );
        if !list.contains(frame_id.0) {
            list.push_front(frame_id.0);
        }
    }

    fn restore(&self, frame_id: FrameId) {
        let mut list = self.list.lock();
        if !list.contains(frame_id.0) {
            list.push_back(frame_id.0);
        }
    }

    fn size(&self) -> usize {
        self.list.lock().len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_victim_order() {
        let lru = LruReplacer::new(7);

        for i in [1, 2, 3, 4, 5, 6] {
            lru.unpin(FrameId(i));
        }
        lru.unpin(FrameId(1));
        assert_eq!(lru.size(), 6);

        assert_eq!(lru.victim(), Some(FrameId(1)));
        assert_eq!(lru.victim(), Some(FrameId(2)));
        assert_eq!(lru.victim(), Some(FrameId(3)));

        lru.pin(FrameId(3));
        lru.pin(FrameId(4));
        assert_eq!(lru.size(), 2);

        lru.unpin(FrameId(4));
        assert_eq!(lru.victim(), Some(FrameId(5)));
        assert_eq!(lru.victim(), Some(FrameId(6)));
        assert_eq!(lru.victim(), Some(FrameId(4)));
        assert_eq!(lru.victim(), None);
    }

    #[test]
    fn test_repin_moves_to_back_of_line() {
        let lru = LruReplacer::new(3);
        lru.unpin(FrameId(0));
        lru.unpin(FrameId(1));
        lru.unpin(FrameId(2));

        // Frame 0 was unpinned first but is pinned and released again.
        lru.pin(FrameId(0));
        lru.unpin(FrameId(0));

        assert_eq!(lru.victim(), Some(FrameId(1)));
        assert_eq!(lru.victim(), Some(FrameId(2)));
        assert_eq!(lru.victim(), Some(FrameId(0)));
    }

    #[test]
    fn test_unpin_is_idempotent() {
        let lru = LruReplacer::new(2);
        lru.unpin(FrameId(0));
        lru.unpin(FrameId(1));
        lru.unpin(FrameId(0));

        assert_eq!(lru.size(), 2);
        assert_eq!(lru.victim(), Some(FrameId(0)));
    }

    #[test]
    fn test_restore_goes_back_to_tail() {
        let lru = LruReplacer::new(3);
        lru.unpin(FrameId(0));
        lru.unpin(FrameId(1));
        lru.unpin(FrameId(2));

        let victim = lru.victim().unwrap();
        assert_eq!(victim, FrameId(0));
        lru.restore(victim);

        assert_eq!(lru.victim(), Some(FrameId(0)));
        assert_eq!(lru.victim(), Some(FrameId(1)));
        assert_eq!(lru.victim(), Some(FrameId(2)));

        // Into an empty list.
        lru.restore(FrameId(1));
        assert_eq!(lru.size(), 1);
        assert_eq!(lru.victim(), Some(FrameId(1)));
    }

    #[test]
    fn test_pin_untracked_is_noop() {
        let lru = LruReplacer::new(2);
        lru.pin(FrameId(1));
        lru.pin(FrameId(7));
        assert_eq!(lru.size(), 0);
    }

    #[test]
    fn test_remove_middle_and_ends() {
        let lru = LruReplacer::new(5);
        for i in 0..5 {
            lru.unpin(FrameId(i));
        }

        lru.pin(FrameId(2));
        lru.pin(FrameId(0));
        lru.pin(FrameId(4));

        assert_eq!(lru.victim(), Some(FrameId(1)));
        assert_eq!(lru.victim(), Some(FrameId(3)));
        assert_eq!(lru.victim(), None);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_unpin_out_of_range() {
        let lru = LruReplacer::new(2);
        lru.unpin(FrameId(2));
    }

    #[test]
    fn test_concurrent_unpin() {
        use std::sync::Arc;
        use std::thread;

        let lru = Arc::new(LruReplacer::new(100));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let lru = Arc::clone(&lru);
                thread::spawn(move || {
                    for i in (t * 25)..((t + 1) * 25) {
                        lru.unpin(FrameId(i));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(lru.size(), 100);
    }
}
