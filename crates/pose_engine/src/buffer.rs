//! Jitter buffer: fixed ring of timestamped pose snapshots.
//!
//! Slots are addressed by `frame_id mod capacity`. A slot whose frame id is 0
//! reads as empty. Writing a slot invalidates every slot strictly between the
//! previous write and the new one, so stale data from an earlier lap of the
//! ring is never picked up as "newer". Invalidation only zeroes the frame id:
//! the interpolator may still be blending out of such a slot.

use std::fmt;

use contracts::{BUFFER_CAPACITY, FILE_PLAYBACK_FRAME_ID};

/// One ring cell.
#[derive(Debug, Clone)]
pub struct BufferSlot<P> {
    pub frame_id: i32,
    pub timestamp: f64,
    pub pose: Option<P>,
}

impl<P> BufferSlot<P> {
    fn empty() -> Self {
        Self {
            frame_id: 0,
            timestamp: 0.0,
            pose: None,
        }
    }

    fn clear(&mut self) {
        self.frame_id = 0;
        self.timestamp = 0.0;
        self.pose = None;
    }

    fn invalidate(&mut self) {
        self.frame_id = 0;
    }

    /// Whether the slot holds a sample (`frame_id != 0`).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.frame_id != 0
    }
}

/// Fixed-capacity ring of pose snapshots.
///
/// Generic over the pose type so the buffer never depends on how a pose is
/// represented; the snapshot is produced by a capture closure.
pub struct JitterBuffer<P> {
    slots: Box<[BufferSlot<P>]>,
    last_write: Option<usize>,
    /// Sequence stand-in for file playback samples (`frame_id == -1`)
    file_counter: i32,
    populated: bool,
}

impl<P> fmt::Debug for JitterBuffer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JitterBuffer")
            .field("capacity", &self.slots.len())
            .field("last_write", &self.last_write)
            .field("populated", &self.populated)
            .finish()
    }
}

impl<P> Default for JitterBuffer<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> JitterBuffer<P> {
    /// Buffer with [`BUFFER_CAPACITY`] slots.
    pub fn new() -> Self {
        Self::with_capacity(BUFFER_CAPACITY)
    }

    /// Buffer with a custom capacity (at least 2).
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity.max(2)).map(|_| BufferSlot::empty()).collect();
        Self {
            slots,
            last_write: None,
            file_counter: 0,
            populated: false,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether anything was written since the last hard reset.
    #[inline]
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Slot written most recently.
    #[inline]
    pub fn last_write(&self) -> Option<usize> {
        self.last_write
    }

    #[inline]
    pub fn slot(&self, index: usize) -> Option<&BufferSlot<P>> {
        self.slots.get(index)
    }

    /// Clear every slot and restart the file playback sequence.
    pub fn hard_reset(&mut self) {
        self.slots.iter_mut().for_each(BufferSlot::clear);
        self.last_write = None;
        self.file_counter = 0;
        self.populated = false;
    }

    /// Write a sample and return its slot.
    ///
    /// File playback samples get consecutive stand-in ids starting at 1 after
    /// each hard reset. `capture` runs after invalidation, right before the
    /// slot is written.
    pub fn snapshot<F>(&mut self, frame_id: i32, timestamp: f64, capture: F) -> usize
    where
        F: FnOnce() -> P,
    {
        let (index, stored_id) = self.place(frame_id);

        if let Some(previous) = self.last_write {
            self.invalidate_between(previous, index);
        }

        let slot = &mut self.slots[index];
        slot.frame_id = stored_id;
        slot.timestamp = timestamp;
        slot.pose = Some(capture());

        self.last_write = Some(index);
        self.populated = true;
        index
    }

    /// First slot after `from` (scanning forward at most `capacity - 1`
    /// steps) whose frame id is nonzero and greater than the one at `from`.
    /// Returns `from` when there is none.
    pub fn find_next_pose(&self, from: usize) -> usize {
        let capacity = self.slots.len();
        let Some(origin) = self.slots.get(from) else {
            return from;
        };
        let base = origin.frame_id;

        (1..capacity)
            .map(|step| (from + step) % capacity)
            .find(|&i| {
                let slot = &self.slots[i];
                slot.is_valid() && slot.frame_id > base
            })
            .unwrap_or(from)
    }

    fn place(&mut self, frame_id: i32) -> (usize, i32) {
        let capacity = self.slots.len();
        if frame_id == FILE_PLAYBACK_FRAME_ID {
            self.file_counter = self.file_counter.checked_add(1).unwrap_or(1);
            let id = self.file_counter;
            (id as usize % capacity, id)
        } else {
            (frame_id.rem_euclid(capacity as i32) as usize, frame_id)
        }
    }

    /// Clear the slots strictly between `previous` and `next`, walking forward
    /// around the ring. `next <= previous` counts as a wrap.
    fn invalidate_between(&mut self, previous: usize, next: usize) {
        let capacity = self.slots.len();
        if next > previous {
            self.slots[previous + 1..next]
                .iter_mut()
                .for_each(BufferSlot::invalidate);
        } else {
            self.slots[previous + 1..capacity]
                .iter_mut()
                .for_each(BufferSlot::invalidate);
            self.slots[..next].iter_mut().for_each(BufferSlot::invalidate);
        }
    }
}
