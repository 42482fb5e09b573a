//! CLOCK (second chance) replacement policy.

use parking_lot::Mutex;

use super::Replacer;
use crate::common::FrameId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Not evictable.
    Empty,
    /// Evictable, reference bit set.
    Referenced,
    /// Evictable, reference bit cleared by a passing hand.
    Unreferenced,
}

#[derive(Debug)]
struct ClockState {
    slots: Vec<Slot>,
    hand: usize,
    size: usize,
}

/// Approximates LRU with a sweeping clock hand.
///
/// A newly unpinned frame gets its reference bit set. The hand clears set
/// bits as it passes and evicts the first frame it finds already cleared,
/// so every evictable frame is skipped at most once.
#[derive(Debug)]
pub struct ClockReplacer {
    state: Mutex<ClockState>,
}

impl ClockReplacer {
    /// Create a replacer for frames `0..num_frames`.
    pub fn new(num_frames: usize) -> Self {
        Self {
            state: Mutex::new(ClockState {
                slots: vec![Slot::Empty; num_frames],
                hand: 0,
                size: 0,
            }),
        }
    }
}

impl Replacer for ClockReplacer {
    fn victim(&self) -> Option<FrameId> {
        let mut state = self.state.lock();
        if state.size == 0 {
            return None;
        }

        // Terminates within two sweeps: the first clears every bit.
        loop {
            let idx = state.hand;
            state.hand = (state.hand + 1) % state.slots.len();
            match state.slots[idx] {
                Slot::Empty => {}
                Slot::Referenced => state.slots[idx] = Slot::Unreferenced,
                Slot::Unreferenced => {
                    state.slots[idx] = Slot::Empty;
                    state.size -= 1;
                    return Some(FrameId(idx));
                }
            }
        }
    }

    fn pin(&self, frame_id: FrameId) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if let Some(slot) = state.slots.get_mut(frame_id.0) {
            if *slot != Slot::Empty {
                *slot = Slot::Empty;
                state.size -= 1;
            }
        }
    }

    fn unpin(&self, frame_id: FrameId) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let num_frames = state.slots.len();
        let slot = state.slots.get_mut(frame_id.0).unwrap_or_else(|| {
            panic!("{} out of range for replacer of {} frames", frame_id, num_frames)
        });
        if *slot == Slot::Empty {
            *slot = Slot::Referenced;
            state.size += 1;
        }
    }

    fn restore(&self, frame_id: FrameId) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let Some(slot) = state.slots.get_mut(frame_id.0) else {
            return;
        };
        if *slot == Slot::Empty {
            // Put the hand back on it so the next sweep stops there first.
            *slot = Slot::Unreferenced;
            state.size += 1;
            state.hand = frame_id.0;
        }
    }

    fn size(&self) -> usize {
        self.state.lock().size
    }
}
