//! Record addresses and typed references.
//!
//! An [`Addr`] encodes where a record lives: the heap and generation that
//! issued it, the page within that generation's pool, and the slot within
//! the page. The heap and generation make staleness and ownership checks an
//! O(1) comparison, and the page/slot pair resolves to storage without any
//! pointer arithmetic.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use strata_core::{GenerationId, HeapId};

/// Physical location of a record within one generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr {
    /// Heap that issued this address.
    pub(crate) heap: HeapId,
    /// Generation that issued this address.
    pub(crate) generation: GenerationId,
    /// Page index within the kind's pool.
    pub(crate) page: u32,
    /// Slot index within the page.
    pub(crate) slot: u32,
}

impl Addr {
    /// Create a new address.
    pub(crate) fn new(heap: HeapId, generation: GenerationId, page: u32, slot: u32) -> Self {
        Self {
            heap,
            generation,
            page,
            slot,
        }
    }

    /// The heap that issued this address.
    pub fn heap(&self) -> HeapId {
        self.heap
    }

    /// The generation this address belongs to.
    pub fn generation(&self) -> GenerationId {
        self.generation
    }

    /// Page index within the pool.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Slot index within the page.
    pub fn slot(&self) -> u32 {
        self.slot
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Addr(heap={}, gen={}, page={}, slot={})",
            self.heap, self.generation, self.page, self.slot
        )
    }
}

/// A typed, nullable-by-`Option` reference to a record of type `T`.
///
/// `Ref` is `Copy` and carries no borrow: it stays valid only for the
/// generation that issued it. After [`crate::Heap::step`], pass every
/// externally held `Ref` through [`crate::Heap::update`]. Two refs denote
/// the same object exactly when they compare equal.
#[must_use]
pub struct Ref<T> {
    addr: Addr,
    marker: PhantomData<fn() -> T>,
}

impl<T> Ref<T> {
    pub(crate) fn from_addr(addr: Addr) -> Self {
        Self {
            addr,
            marker: PhantomData,
        }
    }

    /// The untyped address.
    pub fn addr(self) -> Addr {
        self.addr
    }

    /// The generation this reference belongs to.
    pub fn generation(self) -> GenerationId {
        self.addr.generation
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Ref<T> {}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}

impl<T> Eq for Ref<T> {}

impl<T> Hash for Ref<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr.hash(state);
    }
}

impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ref<{}>(heap={}, gen={}, page={}, slot={})",
            std::any::type_name::<T>(),
            self.addr.heap,
            self.addr.generation,
            self.addr.page,
            self.addr.slot
        )
    }
}
