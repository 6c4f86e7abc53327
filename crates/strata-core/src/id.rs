//! Strongly-typed identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies a record kind within a heap schema.
///
/// Kinds are registered when the schema is built and assigned sequential
/// ordinals. `KindId(n)` is the n-th type registered, and also the index of
/// that kind's pool inside every generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KindId(pub u32);

impl KindId {
    /// The kind ordinal as a pool index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for KindId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing generation counter.
///
/// Generation 0 is the heap's first head. Each `step` produces the next id,
/// even though the storage behind it is recycled from the oldest generation
/// in the ring. Addresses carry the id of the generation that issued them,
/// which makes stale-address detection an O(1) comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationId(pub u64);

impl GenerationId {
    /// The generation that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for GenerationId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Counter for unique [`HeapId`] allocation.
static HEAP_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a heap.
///
/// Every heap starts at generation 0, so the generation alone cannot tell
/// two heaps apart. Addresses carry the id of the heap that issued them and
/// are rejected by any other heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapId(u64);

impl HeapId {
    /// Allocate a fresh id, never returned before within this process.
    /// Thread-safe.
    pub fn next() -> Self {
        Self(HEAP_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HeapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
