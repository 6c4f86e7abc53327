//! Per-kind typed pools and their iterators.
//!
//! A [`Pool`] is a growable list of [`Page`]s for one record type within one
//! generation. Slots are handed out in order and never reused within the
//! generation: `peak` only grows until the generation is recycled, while
//! `len` tracks how many of those slots are still live.
//!
//! Every address a pool issues is stamped with its heap and generation, and
//! every lookup checks both, so refs from another heap or an older
//! generation never resolve.

use std::any::Any;
use std::marker::PhantomData;

use strata_core::{GenerationId, HeapId};

use crate::handle::{Addr, Ref};
use crate::page::Page;
use crate::trace::Record;

/// Storage for every record of one kind in one generation.
pub struct Pool<T> {
    pages: Vec<Page<T>>,
    page_capacity: usize,
    /// Heap stamped into every address this pool issues.
    heap: HeapId,
    /// Generation stamped into every address this pool issues.
    generation: GenerationId,
    /// Live slot count.
    len: usize,
    /// Slots handed out since the last reset.
    peak: usize,
}

impl<T> Pool<T> {
    /// Create an empty pool. No page is allocated until the first `create`.
    pub fn new(heap: HeapId, page_capacity: usize, generation: GenerationId) -> Self {
        Self {
            pages: Vec::new(),
            page_capacity,
            heap,
            generation,
            len: 0,
            peak: 0,
        }
    }

    /// Store `value` in the next free slot, appending a page if needed.
    pub fn create(&mut self, value: T) -> Ref<T> {
        let index = self.peak;
        let page = index / self.page_capacity;
        let slot = index % self.page_capacity;
        if page == self.pages.len() {
            self.pages.push(Page::new(self.page_capacity));
        }
        self.pages[page].fill(slot, value);
        self.peak += 1;
        self.len += 1;
        Ref::from_addr(Addr::new(self.heap, self.generation, page as u32, slot as u32))
    }

    /// Mark the record behind `r` dead.
    ///
    /// Returns `false` without touching anything if `r` was not issued by
    /// this pool (including refs from other heaps or generations) or is
    /// already dead.
    pub fn destroy(&mut self, r: Ref<T>) -> bool {
        self.destroy_addr(r.addr())
    }

    /// Untyped [`Pool::destroy`].
    pub fn destroy_addr(&mut self, addr: Addr) -> bool {
        let Some((page, slot)) = self.locate(addr) else {
            return false;
        };
        if self.pages[page].kill(slot) {
            self.len -= 1;
            true
        } else {
            false
        }
    }

    /// Shared access to a live record.
    pub fn get(&self, r: Ref<T>) -> Option<&T> {
        let (page, slot) = self.locate(r.addr())?;
        self.pages[page].get(slot)
    }

    /// Mutable access to a live record.
    pub fn get_mut(&mut self, r: Ref<T>) -> Option<&mut T> {
        let (page, slot) = self.locate(r.addr())?;
        self.pages[page].get_mut(slot)
    }

    /// Whether `addr` names a live slot of this pool.
    pub fn is_live(&self, addr: Addr) -> bool {
        self.locate(addr)
            .is_some_and(|(page, slot)| self.pages[page].is_live(slot))
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the pool holds no live records.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slots handed out since the pool was last reset.
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Number of pages allocated, including pages kept from earlier use.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Slots per page.
    pub fn page_capacity(&self) -> usize {
        self.page_capacity
    }

    /// Heap whose addresses this pool issues.
    pub fn heap(&self) -> HeapId {
        self.heap
    }

    /// Generation whose addresses this pool issues.
    pub fn generation(&self) -> GenerationId {
        self.generation
    }

    /// Memory usage of all pages in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.pages.iter().map(|p| p.memory_bytes()).sum()
    }

    /// Live records that exist now; later creations are not visited.
    pub fn iter_current(&self) -> Iter<'_, T> {
        Iter {
            pool: self,
            position: 0,
            bound: self.peak,
        }
    }

    /// Detached variant of [`Pool::iter_current`] that does not borrow the pool.
    pub fn cursor_current(&self) -> Cursor<T> {
        Cursor {
            heap: self.heap,
            generation: self.generation,
            position: 0,
            bound: Some(self.peak),
            marker: PhantomData,
        }
    }

    /// Detached cursor that also visits records created while it is in flight.
    pub fn cursor_all(&self) -> Cursor<T> {
        Cursor {
            heap: self.heap,
            generation: self.generation,
            position: 0,
            bound: None,
            marker: PhantomData,
        }
    }

    /// Resolve `addr` to `(page, slot)` if this pool issued it.
    fn locate(&self, addr: Addr) -> Option<(usize, usize)> {
        if addr.heap != self.heap || addr.generation != self.generation {
            return None;
        }
        let page = addr.page as usize;
        let slot = addr.slot as usize;
        if page >= self.pages.len() || slot >= self.page_capacity {
            return None;
        }
        if page * self.page_capacity + slot >= self.peak {
            return None;
        }
        Some((page, slot))
    }

    /// First live slot index in `from..limit`.
    fn next_live(&self, from: usize, limit: usize) -> Option<usize> {
        let limit = limit.min(self.peak);
        (from..limit).find(|&index| {
            self.pages[index / self.page_capacity].is_live(index % self.page_capacity)
        })
    }

    fn addr_at(&self, index: usize) -> Addr {
        Addr::new(
            self.heap,
            self.generation,
            (index / self.page_capacity) as u32,
            (index % self.page_capacity) as u32,
        )
    }

    /// Clear every used slot and restamp the pool for a new generation.
    ///
    /// Pages stay allocated so a recycled generation reuses its memory.
    pub(crate) fn reset(&mut self, generation: GenerationId) {
        let mut remaining = self.peak;
        for page in &mut self.pages {
            if remaining == 0 {
                break;
            }
            let used = remaining.min(self.page_capacity);
            page.reset(used);
            remaining -= used;
        }
        self.generation = generation;
        self.len = 0;
        self.peak = 0;
    }

    /// Move a live payload out for scanning. See [`Page::take`].
    pub(crate) fn take(&mut self, addr: Addr) -> Option<T> {
        let (page, slot) = self.locate(addr)?;
        self.pages[page].take(slot)
    }

    /// Put back a payload moved out by [`Pool::take`].
    pub(crate) fn restore(&mut self, addr: Addr, value: T) {
        if let Some((page, slot)) = self.locate(addr) {
            self.pages[page].restore(slot, value);
        }
    }
}

/// Borrowing iterator over the live records of a [`Pool`].
///
/// Bounded by the pool's `peak` at construction.
pub struct Iter<'a, T> {
    pool: &'a Pool<T>,
    position: usize,
    bound: usize,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = Ref<T>;

    fn next(&mut self) -> Option<Ref<T>> {
        let index = self.pool.next_live(self.position, self.bound)?;
        self.position = index + 1;
        Some(Ref::from_addr(self.pool.addr_at(index)))
    }
}

/// Forward cursor over a pool that holds no borrow between advances.
///
/// A cursor built by [`Pool::cursor_current`] stops at the `peak` observed
/// when it was built. One built by [`Pool::cursor_all`] re-reads `peak` on
/// every advance, so records appended during iteration are visited too.
/// A cursor yields nothing once its pool has been recycled for another
/// generation, or when advanced over a pool of another heap.
#[derive(Clone, Debug)]
pub struct Cursor<T> {
    heap: HeapId,
    generation: GenerationId,
    position: usize,
    bound: Option<usize>,
    marker: PhantomData<fn() -> T>,
}

impl<T> Cursor<T> {
    /// Advance over `pool`, returning the next live record.
    pub fn next(&mut self, pool: &Pool<T>) -> Option<Ref<T>> {
        if pool.heap != self.heap || pool.generation != self.generation {
            return None;
        }
        let limit = self.bound.unwrap_or(usize::MAX);
        let index = pool.next_live(self.position, limit)?;
        self.position = index + 1;
        Some(Ref::from_addr(pool.addr_at(index)))
    }

    /// Generation this cursor walks.
    pub fn generation(&self) -> GenerationId {
        self.generation
    }
}

/// How an address stands in the generation being collected from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SlotState {
    /// Not issued by this pool.
    Missing,
    /// Destroyed before the step.
    Dead,
    /// Already copied during this step.
    Forwarded(Addr),
    /// Live and not yet copied.
    Unvisited { page: usize, slot: usize },
}

/// Kind-erased pool operations used by generations and the collector.
pub(crate) trait ErasedPool: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn reset(&mut self, generation: GenerationId);
    fn len(&self) -> usize;
    fn memory_bytes(&self) -> usize;
    fn is_live(&self, addr: Addr) -> bool;
    fn slot_state(&self, addr: Addr) -> SlotState;
    fn set_remap(&mut self, page: usize, slot: usize, to: Addr);
    /// First live slot at or after `from`, bounded by the current peak.
    fn next_live_addr(&self, from: usize) -> Option<(usize, Addr)>;
    /// Clone the live record at `(page, slot)` into `dst`, a pool of the same type.
    fn copy_into(&self, page: usize, slot: usize, dst: &mut dyn ErasedPool) -> Addr;
}

impl<T: Record> ErasedPool for Pool<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn reset(&mut self, generation: GenerationId) {
        Pool::reset(self, generation);
    }

    fn len(&self) -> usize {
        self.len
    }

    fn memory_bytes(&self) -> usize {
        Pool::memory_bytes(self)
    }

    fn is_live(&self, addr: Addr) -> bool {
        Pool::is_live(self, addr)
    }

    fn slot_state(&self, addr: Addr) -> SlotState {
        let Some((page, slot)) = self.locate(addr) else {
            return SlotState::Missing;
        };
        let page_ref = &self.pages[page];
        if !page_ref.is_live(slot) {
            return SlotState::Dead;
        }
        match page_ref.remap(slot) {
            Some(to) => SlotState::Forwarded(to),
            None => SlotState::Unvisited { page, slot },
        }
    }

    fn set_remap(&mut self, page: usize, slot: usize, to: Addr) {
        self.pages[page].set_remap(slot, to);
    }

    fn next_live_addr(&self, from: usize) -> Option<(usize, Addr)> {
        let index = self.next_live(from, usize::MAX)?;
        Some((index, self.addr_at(index)))
    }

    fn copy_into(&self, page: usize, slot: usize, dst: &mut dyn ErasedPool) -> Addr {
        let dst = dst
            .as_any_mut()
            .downcast_mut::<Pool<T>>()
            .expect("pools of one kind share a record type");
        let record = self.pages[page]
            .get(slot)
            .cloned()
            .expect("unvisited slot holds a live record");
        dst.create(record).addr()
    }
}
