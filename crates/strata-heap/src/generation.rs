//! Heap generations and read-only views of them.
//!
//! A [`Generation`] owns one pool per record kind and a link to the
//! generation it was copied from. The heap keeps a fixed number of them in
//! a ring and recycles the oldest whenever it steps.

use strata_core::{GenerationId, HeapError, HeapId, KindId};

use crate::handle::Ref;
use crate::pool::{ErasedPool, Iter, Pool};
use crate::schema::Schema;
use crate::trace::Record;

/// One heap snapshot: a pool per kind plus the `prev` link.
pub struct Generation {
    id: GenerationId,
    /// Ring index of the older generation, `None` for the oldest.
    prev: Option<usize>,
    /// Indexed by kind ordinal.
    pools: Vec<Box<dyn ErasedPool>>,
}

impl Generation {
    pub(crate) fn new(
        schema: &Schema,
        heap: HeapId,
        page_capacity: usize,
        id: GenerationId,
    ) -> Self {
        Self {
            id,
            prev: None,
            pools: schema.new_pools(heap, page_capacity, id),
        }
    }

    /// This generation's id.
    pub fn id(&self) -> GenerationId {
        self.id
    }

    /// Total live records across every kind.
    pub fn live_count(&self) -> usize {
        self.pools.iter().map(|p| p.len()).sum()
    }

    /// Memory held by every pool, including pages kept from earlier use.
    pub fn memory_bytes(&self) -> usize {
        self.pools.iter().map(|p| p.memory_bytes()).sum()
    }

    pub(crate) fn prev(&self) -> Option<usize> {
        self.prev
    }

    pub(crate) fn set_prev(&mut self, prev: Option<usize>) {
        self.prev = prev;
    }

    /// Wipe every pool and take on a new identity.
    ///
    /// Pages are kept, so steady-state stepping allocates nothing new.
    pub(crate) fn recycle(&mut self, id: GenerationId) {
        self.id = id;
        self.prev = None;
        for pool in &mut self.pools {
            pool.reset(id);
        }
    }

    pub(crate) fn pool(&self, kind: KindId) -> &dyn ErasedPool {
        &*self.pools[kind.index()]
    }

    pub(crate) fn pool_mut(&mut self, kind: KindId) -> &mut dyn ErasedPool {
        &mut *self.pools[kind.index()]
    }

    pub(crate) fn typed_pool<T: Record>(&self, kind: KindId) -> &Pool<T> {
        self.pools[kind.index()]
            .as_any()
            .downcast_ref::<Pool<T>>()
            .expect("kind holds a pool of its registered type")
    }

    pub(crate) fn typed_pool_mut<T: Record>(&mut self, kind: KindId) -> &mut Pool<T> {
        self.pools[kind.index()]
            .as_any_mut()
            .downcast_mut::<Pool<T>>()
            .expect("kind holds a pool of its registered type")
    }
}

/// A read-only view of one generation in the heap's history.
///
/// Obtained from [`crate::Heap::history`]. Borrows the heap, so no step can
/// recycle the generation while the view exists.
#[derive(Clone, Copy)]
pub struct GenerationView<'a> {
    schema: &'a Schema,
    generation: &'a Generation,
}

impl<'a> GenerationView<'a> {
    pub(crate) fn new(schema: &'a Schema, generation: &'a Generation) -> Self {
        Self { schema, generation }
    }

    /// The viewed generation's id.
    pub fn id(&self) -> GenerationId {
        self.generation.id
    }

    /// The pool holding records of type `T`.
    pub fn pool<T: Record>(&self) -> Result<&'a Pool<T>, HeapError> {
        let kind = self.schema.kind_of::<T>()?;
        Ok(self.generation.typed_pool::<T>(kind))
    }

    /// Read a record issued by this generation.
    pub fn get<T: Record>(&self, r: Ref<T>) -> Option<&'a T> {
        self.pool::<T>().ok()?.get(r)
    }

    /// Live records of type `T`.
    pub fn len<T: Record>(&self) -> Result<usize, HeapError> {
        Ok(self.pool::<T>()?.len())
    }

    /// Iterate the live records of type `T`.
    pub fn iter<T: Record>(&self) -> Result<Iter<'a, T>, HeapError> {
        Ok(self.pool::<T>()?.iter_current())
    }

    /// Total live records across every kind.
    pub fn live_count(&self) -> usize {
        self.generation.live_count()
    }
}
