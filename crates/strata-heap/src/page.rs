//! Fixed-capacity slot pages.
//!
//! A [`Page`] is the storage unit of a pool: N record slots with a parallel
//! liveness array and a parallel remap array. Pages are appended to a pool,
//! never removed individually, and are reset in bulk when their generation
//! is recycled.

use crate::handle::Addr;

/// A block of `capacity` slots holding records of one type.
///
/// `remap[i]` records where slot `i` was copied to during the step that
/// superseded this page's generation. It doubles as the "visited" marker
/// for that step and is cleared whenever the page is reused.
pub struct Page<T> {
    /// Record payloads. `None` for slots never filled or already destroyed.
    items: Vec<Option<T>>,
    /// Liveness per slot.
    live: Vec<bool>,
    /// Forwarding address per slot, valid only for the step that wrote it.
    remap: Vec<Option<Addr>>,
}

impl<T> Page<T> {
    /// Create an empty page with room for `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: (0..capacity).map(|_| None).collect(),
            live: vec![false; capacity],
            remap: vec![None; capacity],
        }
    }

    /// Number of slots in this page.
    pub fn capacity(&self) -> usize {
        self.live.len()
    }

    /// Store `value` in `slot` and mark it live.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= capacity`.
    pub fn fill(&mut self, slot: usize, value: T) {
        self.items[slot] = Some(value);
        self.live[slot] = true;
        self.remap[slot] = None;
    }

    /// Mark `slot` dead and drop its payload.
    ///
    /// Returns `false` if the slot was already dead.
    pub fn kill(&mut self, slot: usize) -> bool {
        if !self.live[slot] {
            return false;
        }
        self.live[slot] = false;
        self.items[slot] = None;
        true
    }

    /// Whether `slot` holds a live record.
    pub fn is_live(&self, slot: usize) -> bool {
        self.live[slot]
    }

    /// Shared access to a live record.
    pub fn get(&self, slot: usize) -> Option<&T> {
        if self.live[slot] {
            self.items[slot].as_ref()
        } else {
            None
        }
    }

    /// Mutable access to a live record.
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        if self.live[slot] {
            self.items[slot].as_mut()
        } else {
            None
        }
    }

    /// Where `slot` was copied to during the last step, if it was.
    pub fn remap(&self, slot: usize) -> Option<Addr> {
        self.remap[slot]
    }

    /// Record the copy destination of `slot`.
    pub(crate) fn set_remap(&mut self, slot: usize, to: Addr) {
        self.remap[slot] = Some(to);
    }

    /// Move the payload out while leaving the slot live.
    ///
    /// Used by the collector to scan a fresh copy without holding a borrow
    /// on the pool; the payload must be put back with [`Page::restore`].
    pub(crate) fn take(&mut self, slot: usize) -> Option<T> {
        self.items[slot].take()
    }

    /// Put back a payload moved out by [`Page::take`].
    pub(crate) fn restore(&mut self, slot: usize, value: T) {
        self.items[slot] = Some(value);
    }

    /// Clear the first `used` slots for reuse by a new generation.
    ///
    /// Slots beyond `used` were never filled since the last reset and are
    /// already clear.
    pub fn reset(&mut self, used: usize) {
        let used = used.min(self.capacity());
        for slot in 0..used {
            self.items[slot] = None;
            self.live[slot] = false;
            self.remap[slot] = None;
        }
    }

    /// Memory usage of the slot arrays in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.capacity()
            * (std::mem::size_of::<Option<T>>()
                + std::mem::size_of::<bool>()
                + std::mem::size_of::<Option<Addr>>())
    }
}
