//! Ring-of-generations heap orchestrator.
//!
//! [`Heap`] is the top-level type. It owns `depth` generations allocated up
//! front. The head generation takes all creations and destructions. On
//! [`Heap::step`], a spare generation (or, once every spare is in use, the
//! oldest generation in the chain) is wiped and filled with the records
//! reachable from the root kinds, then linked in as the new head.
//!
//! ```text
//! step 0:  [g0]                 spares: 1, 2
//! step 1:  [g1] → g0            spares: 2
//! step 2:  [g2] → g1 → g0       spares: -
//! step 3:  [g3] → g2 → g1       (g0's storage recycled as g3)
//! ```

use smallvec::SmallVec;
use strata_core::{GenerationId, HeapError, HeapId, KindId};

use crate::collector::Collector;
use crate::config::HeapConfig;
use crate::generation::{Generation, GenerationView};
use crate::handle::Ref;
use crate::pool::{Cursor, Iter, Pool, SlotState};
use crate::schema::Schema;
use crate::trace::Record;

/// Outcome of one [`Heap::step`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepReport {
    /// Id of the new head generation.
    pub generation: GenerationId,
    /// Records copied into the new generation.
    pub copied: usize,
    /// Records copied, indexed by kind ordinal.
    pub copied_per_kind: SmallVec<[usize; 8]>,
    /// Live records of the old head that were not copied.
    pub dropped: usize,
    /// Whether the new generation reused the oldest one's storage (as
    /// opposed to a never-used spare).
    pub recycled: bool,
    /// Deepest the collector's pending-scan stack grew.
    pub max_worklist: usize,
}

impl StepReport {
    /// Records of `kind` copied into the new generation.
    pub fn copied_of(&self, kind: KindId) -> usize {
        self.copied_per_kind.get(kind.index()).copied().unwrap_or(0)
    }
}

/// Generational tracing/copying heap.
///
/// # Example
///
/// ```
/// use strata_heap::{Heap, HeapConfig, Ref, Schema, Trace, Tracer};
///
/// #[derive(Clone)]
/// struct Node {
///     next: Option<Ref<Node>>,
/// }
///
/// impl Trace for Node {
///     fn trace(&mut self, tracer: &mut Tracer<'_, '_>) {
///         self.next.trace(tracer);
///     }
/// }
///
/// let mut schema = Schema::new();
/// let node = schema.register::<Node>("node").unwrap();
/// let mut heap = Heap::new(schema, HeapConfig::default()).unwrap();
///
/// let a = heap.create(Node { next: None }).unwrap();
/// heap.get_mut(a).unwrap().next = Some(a);
///
/// heap.step(&[node]).unwrap();
/// let a = heap.update(a).unwrap();
/// assert_eq!(heap.get(a).unwrap().next, Some(a));
/// ```
pub struct Heap {
    /// Stamped into every address this heap issues.
    id: HeapId,
    schema: Schema,
    config: HeapConfig,
    /// Ring storage. Chain order lives in each generation's `prev`.
    generations: Vec<Generation>,
    /// Ring index of the current generation.
    head: usize,
    /// Ring indices never linked into the chain yet. Popped from the back.
    spares: Vec<usize>,
}

impl Heap {
    /// Create a heap of `config.depth` generations for the kinds in `schema`.
    ///
    /// Every generation and every pool is built here; pages are allocated
    /// lazily on first use. Returns `Err(HeapError::InvalidConfig)` if the
    /// config is out of bounds.
    pub fn new(schema: Schema, config: HeapConfig) -> Result<Self, HeapError> {
        config.validate()?;

        let id = HeapId::next();
        let generations = (0..config.depth)
            .map(|_| Generation::new(&schema, id, config.page_capacity, GenerationId(0)))
            .collect();
        let spares = (1..config.depth).rev().collect();

        Ok(Self {
            id,
            schema,
            config,
            generations,
            head: 0,
            spares,
        })
    }

    /// This heap's instance id, carried by every [`Ref`] it issues.
    pub fn id(&self) -> HeapId {
        self.id
    }

    /// The sealed kind registry.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get a reference to the heap config.
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Id of the current (head) generation.
    pub fn generation(&self) -> GenerationId {
        self.head().id()
    }

    /// The kind `T` was registered under.
    pub fn kind_of<T: 'static>(&self) -> Result<KindId, HeapError> {
        self.schema.kind_of::<T>()
    }

    fn head(&self) -> &Generation {
        &self.generations[self.head]
    }

    fn head_mut(&mut self) -> &mut Generation {
        &mut self.generations[self.head]
    }

    /// The head generation's pool for `T`.
    pub fn pool<T: Record>(&self) -> Result<&Pool<T>, HeapError> {
        let kind = self.schema.kind_of::<T>()?;
        Ok(self.head().typed_pool::<T>(kind))
    }

    /// Mutable access to the head generation's pool for `T`.
    pub fn pool_mut<T: Record>(&mut self) -> Result<&mut Pool<T>, HeapError> {
        let kind = self.schema.kind_of::<T>()?;
        Ok(self.head_mut().typed_pool_mut::<T>(kind))
    }

    /// Store a record in the head generation, inferring its kind from `T`.
    pub fn create<T: Record>(&mut self, value: T) -> Result<Ref<T>, HeapError> {
        Ok(self.pool_mut::<T>()?.create(value))
    }

    /// Store a record under an explicitly named kind.
    ///
    /// Returns `Err(HeapError::KindMismatch)` if `kind` does not hold `T`.
    pub fn create_in<T: Record>(&mut self, kind: KindId, value: T) -> Result<Ref<T>, HeapError> {
        self.schema.check_type::<T>(kind)?;
        Ok(self.head_mut().typed_pool_mut::<T>(kind).create(value))
    }

    /// Mark a record dead.
    ///
    /// Returns `false` if `r` is already dead, belongs to an older
    /// generation or to another heap, or its type is not registered.
    pub fn destroy<T: Record>(&mut self, r: Ref<T>) -> bool {
        self.pool_mut::<T>().is_ok_and(|pool| pool.destroy(r))
    }

    /// Read a live record of the head generation.
    pub fn get<T: Record>(&self, r: Ref<T>) -> Option<&T> {
        self.pool::<T>().ok()?.get(r)
    }

    /// Mutate a live record of the head generation.
    pub fn get_mut<T: Record>(&mut self, r: Ref<T>) -> Option<&mut T> {
        self.pool_mut::<T>().ok()?.get_mut(r)
    }

    /// Live records of type `T` in the head generation.
    pub fn len<T: Record>(&self) -> Result<usize, HeapError> {
        Ok(self.pool::<T>()?.len())
    }

    /// Slots of type `T` handed out in the head generation.
    pub fn peak<T: Record>(&self) -> Result<usize, HeapError> {
        Ok(self.pool::<T>()?.peak())
    }

    /// Total live records in the head generation.
    pub fn live_count(&self) -> usize {
        self.head().live_count()
    }

    /// Iterate the records of type `T` that are live now.
    pub fn iter_current<T: Record>(&self) -> Result<Iter<'_, T>, HeapError> {
        Ok(self.pool::<T>()?.iter_current())
    }

    /// Detached [`Heap::iter_current`]; advance it with [`Heap::advance`].
    pub fn cursor_current<T: Record>(&self) -> Result<Cursor<T>, HeapError> {
        Ok(self.pool::<T>()?.cursor_current())
    }

    /// Detached cursor that also visits records created while it runs.
    ///
    /// ```
    /// # use strata_heap::{Heap, HeapConfig, Schema, Trace};
    /// # #[derive(Clone)] struct Count(u32);
    /// # impl Trace for Count {}
    /// # let schema = Schema::new().with::<Count>("count").unwrap();
    /// # let mut heap = Heap::new(schema, HeapConfig::default()).unwrap();
    /// heap.create(Count(0)).unwrap();
    /// let mut cursor = heap.cursor_all::<Count>().unwrap();
    /// while let Some(r) = heap.advance(&mut cursor) {
    ///     let n = heap.get(r).unwrap().0;
    ///     if n < 9 {
    ///         heap.create(Count(n + 1)).unwrap();
    ///     }
    /// }
    /// assert_eq!(heap.len::<Count>().unwrap(), 10);
    /// ```
    pub fn cursor_all<T: Record>(&self) -> Result<Cursor<T>, HeapError> {
        Ok(self.pool::<T>()?.cursor_all())
    }

    /// Advance a cursor over the head generation.
    ///
    /// Yields nothing once the heap has stepped past the cursor's generation.
    pub fn advance<T: Record>(&self, cursor: &mut Cursor<T>) -> Option<Ref<T>> {
        cursor.next(self.pool::<T>().ok()?)
    }

    /// Produce the next generation from the records reachable from `roots`.
    ///
    /// Every live record of each root kind is copied, together with every
    /// record it transitively references. Shared targets are copied once and
    /// references to destroyed records become `None`. Records that are not
    /// reached are dropped. Root kinds are traced in the order given.
    ///
    /// Returns `Err(HeapError::UnknownKind)` before touching anything if a
    /// root kind is not in the schema.
    ///
    /// # Panics
    ///
    /// Panics if a traced record references a type missing from the schema.
    pub fn step(&mut self, roots: &[KindId]) -> Result<StepReport, HeapError> {
        for &kind in roots {
            self.schema.check_kind(kind)?;
        }

        let from = self.head;
        let next_id = self.generations[from].id().next();
        let (to, recycled) = match self.spares.pop() {
            Some(spare) => (spare, false),
            None => (self.detach_oldest(), true),
        };

        let target = &mut self.generations[to];
        target.recycle(next_id);
        target.set_prev(Some(from));

        let live_before = self.generations[from].live_count();
        let (old, new) = pair_mut(&mut self.generations, from, to);
        let stats = Collector::new(&self.schema, old, new).run(roots);
        self.head = to;

        let copied: usize = stats.copied_per_kind.iter().sum();
        let report = StepReport {
            generation: next_id,
            copied,
            copied_per_kind: stats.copied_per_kind,
            dropped: live_before.saturating_sub(copied),
            recycled,
            max_worklist: stats.max_worklist,
        };
        tracing::debug!(
            generation = %report.generation,
            copied = report.copied,
            dropped = report.dropped,
            recycled = report.recycled,
            max_worklist = report.max_worklist,
            "heap stepped"
        );
        Ok(report)
    }

    /// Unlink the oldest generation from the chain and return its ring index.
    fn detach_oldest(&mut self) -> usize {
        let mut newer = self.head;
        let mut oldest = self.head;
        while let Some(prev) = self.generations[oldest].prev() {
            newer = oldest;
            oldest = prev;
        }
        // depth >= 2 and no spares left, so the chain has at least two links.
        debug_assert_ne!(oldest, self.head);
        self.generations[newer].set_prev(None);
        tracing::trace!(
            generation = %self.generations[oldest].id(),
            "recycling oldest generation"
        );
        oldest
    }

    /// Resolve a reference across the most recent step.
    ///
    /// - A ref from the previous generation resolves to its copy, or to
    ///   `None` if it was destroyed before the step or not reachable from
    ///   the roots.
    /// - A ref from the head generation resolves to itself while live.
    /// - Anything older, or from another heap, resolves to `None`.
    pub fn update<T: Record>(&self, r: Ref<T>) -> Option<Ref<T>> {
        if r.addr().heap() != self.id {
            return None;
        }
        let kind = self.schema.lookup::<T>()?;
        let head = self.head();
        if r.generation() == head.id() {
            return head.pool(kind).is_live(r.addr()).then_some(r);
        }
        let prev = &self.generations[head.prev()?];
        match prev.pool(kind).slot_state(r.addr()) {
            SlotState::Forwarded(to) => Some(Ref::from_addr(to)),
            SlotState::Missing | SlotState::Dead | SlotState::Unvisited { .. } => None,
        }
    }

    /// Generations from the head backwards along `prev`.
    ///
    /// Yields at most `depth` views; anything older has been recycled.
    pub fn history(&self) -> History<'_> {
        History {
            heap: self,
            next: Some(self.head),
        }
    }

    /// Memory held by every generation in the ring, in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.generations.iter().map(|g| g.memory_bytes()).sum()
    }
}

/// Iterator returned by [`Heap::history`].
pub struct History<'a> {
    heap: &'a Heap,
    next: Option<usize>,
}

impl<'a> Iterator for History<'a> {
    type Item = GenerationView<'a>;

    fn next(&mut self) -> Option<GenerationView<'a>> {
        let index = self.next?;
        let generation = &self.heap.generations[index];
        self.next = generation.prev();
        Some(GenerationView::new(&self.heap.schema, generation))
    }
}

/// Split borrow of two distinct ring slots.
fn pair_mut(
    generations: &mut [Generation],
    a: usize,
    b: usize,
) -> (&mut Generation, &mut Generation) {
    assert_ne!(a, b, "a step must copy between distinct generations");
    if a < b {
        let (left, right) = generations.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = generations.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{Trace, Tracer};

    #[derive(Clone, Debug, PartialEq)]
    struct Cons {
        value: u32,
        next: Option<Ref<Cons>>,
    }

    impl Trace for Cons {
        fn trace(&mut self, tracer: &mut Tracer<'_, '_>) {
            self.next.trace(tracer);
        }
    }

    #[derive(Clone, Debug)]
    struct Root {
        items: Vec<Option<Ref<Cons>>>,
    }

    impl Trace for Root {
        fn trace(&mut self, tracer: &mut Tracer<'_, '_>) {
            self.items.trace(tracer);
        }
    }

    #[derive(Clone)]
    struct Stray {
        target: Option<Ref<Unlisted>>,
    }

    impl Trace for Stray {
        fn trace(&mut self, tracer: &mut Tracer<'_, '_>) {
            self.target.trace(tracer);
        }
    }

    #[derive(Clone)]
    struct Unlisted;
    impl Trace for Unlisted {}

    const CONS: KindId = KindId(0);
    const ROOT: KindId = KindId(1);

    fn heap(depth: usize) -> Heap {
        let schema = Schema::new()
            .with::<Cons>("cons")
            .and_then(|s| s.with::<Root>("root"))
            .unwrap();
        Heap::new(schema, HeapConfig::new(depth).with_page_capacity(4)).unwrap()
    }

    #[test]
    fn new_rejects_shallow_ring() {
        let err = Heap::new(Schema::new(), HeapConfig::new(1)).err();
        assert!(matches!(err, Some(HeapError::InvalidConfig { .. })));
    }

    #[test]
    fn create_and_read_back() {
        let mut heap = heap(2);
        let r = heap.create(Cons { value: 5, next: None }).unwrap();
        assert_eq!(heap.get(r).map(|c| c.value), Some(5));
        assert_eq!(heap.len::<Cons>(), Ok(1));
        assert_eq!(heap.generation(), GenerationId(0));
    }

    #[test]
    fn create_in_checks_kind() {
        let mut heap = heap(2);
        assert!(heap.create_in(CONS, Cons { value: 1, next: None }).is_ok());
        let err = heap
            .create_in(ROOT, Cons { value: 1, next: None })
            .unwrap_err();
        assert!(matches!(err, HeapError::KindMismatch { kind: ROOT, .. }));
        assert_eq!(
            heap.create_in(KindId(9), Cons { value: 1, next: None }),
            Err(HeapError::UnknownKind { kind: KindId(9) })
        );
    }

    #[test]
    fn create_unregistered_type_is_error() {
        let mut heap = heap(2);
        assert!(matches!(
            heap.create(Unlisted),
            Err(HeapError::UnregisteredType { .. })
        ));
    }

    #[test]
    fn step_with_unknown_root_leaves_heap_untouched() {
        let mut heap = heap(2);
        heap.create(Cons { value: 1, next: None }).unwrap();
        let err = heap.step(&[CONS, KindId(42)]).unwrap_err();
        assert_eq!(err, HeapError::UnknownKind { kind: KindId(42) });
        assert_eq!(heap.generation(), GenerationId(0));
        assert_eq!(heap.len::<Cons>(), Ok(1));
    }

    #[test]
    fn step_copies_root_kind_and_advances_head() {
        let mut heap = heap(2);
        let a = heap.create(Cons { value: 1, next: None }).unwrap();
        let report = heap.step(&[CONS]).unwrap();
        assert_eq!(report.generation, GenerationId(1));
        assert_eq!(report.copied, 1);
        assert_eq!(report.copied_of(CONS), 1);
        assert!(!report.recycled);
        assert_eq!(heap.generation(), GenerationId(1));

        let a2 = heap.update(a).unwrap();
        assert_ne!(a, a2);
        assert_eq!(heap.get(a2).map(|c| c.value), Some(1));
        assert!(heap.get(a).is_none(), "old refs do not read the new head");
    }

    #[test]
    fn step_without_roots_drops_everything() {
        let mut heap = heap(2);
        let a = heap.create(Cons { value: 1, next: None }).unwrap();
        let report = heap.step(&[]).unwrap();
        assert_eq!(report.copied, 0);
        assert_eq!(report.dropped, 1);
        assert_eq!(heap.live_count(), 0);
        assert_eq!(heap.update(a), None);
    }

    #[test]
    fn dropped_counts_unreached_records_of_other_kinds() {
        let mut heap = heap(2);
        let kept = heap.create(Cons { value: 1, next: None }).unwrap();
        for value in 2..5 {
            heap.create(Cons { value, next: None }).unwrap();
        }
        heap.create(Root { items: vec![Some(kept)] }).unwrap();
        heap.create(Root { items: vec![] }).unwrap();

        let report = heap.step(&[ROOT]).unwrap();
        assert_eq!(report.copied_of(ROOT), 2);
        assert_eq!(report.copied_of(CONS), 1);
        assert_eq!(report.dropped, 3);
        assert_eq!(heap.live_count(), 3);
    }

    #[test]
    fn foreign_ref_inside_record_is_nulled() {
        let mut other = heap(2);
        let foreign = other.create(Cons { value: 9, next: None }).unwrap();

        let mut heap = heap(2);
        heap.create(Cons { value: 1, next: None }).unwrap();
        let root = heap.create(Root { items: vec![Some(foreign)] }).unwrap();
        let report = heap.step(&[ROOT]).unwrap();
        assert_eq!(report.copied_of(CONS), 0);

        let root = heap.update(root).unwrap();
        assert_eq!(heap.get(root).unwrap().items, vec![None]);
        assert_eq!(other.get(foreign).map(|c| c.value), Some(9));
    }

    #[test]
    fn heaps_have_distinct_ids() {
        let a = heap(2);
        let b = heap(2);
        assert_ne!(a.id(), b.id());
        let mut c = heap(2);
        let r = c.create(Cons { value: 1, next: None }).unwrap();
        assert_eq!(r.addr().heap(), c.id());
    }

    #[test]
    fn shared_target_copied_once() {
        let mut heap = heap(2);
        let shared = heap.create(Cons { value: 7, next: None }).unwrap();
        let root = heap
            .create(Root {
                items: vec![Some(shared), Some(shared), None],
            })
            .unwrap();
        let report = heap.step(&[ROOT]).unwrap();
        assert_eq!(report.copied_of(ROOT), 1);
        assert_eq!(report.copied_of(CONS), 1);

        let root = heap.update(root).unwrap();
        let items = &heap.get(root).unwrap().items;
        assert_eq!(items[0], items[1]);
        assert_eq!(items[2], None);
        assert_eq!(items[0], heap.update(shared));
    }

    #[test]
    fn destroyed_target_nulled() {
        let mut heap = heap(2);
        let gone = heap.create(Cons { value: 1, next: None }).unwrap();
        let keep = heap.create(Cons { value: 2, next: Some(gone) }).unwrap();
        let root = heap
            .create(Root {
                items: vec![Some(keep)],
            })
            .unwrap();
        assert!(heap.destroy(gone));
        heap.step(&[ROOT]).unwrap();

        let keep = heap.update(keep).unwrap();
        assert_eq!(heap.get(keep).unwrap().next, None);
        assert_eq!(heap.update(gone), None);
        assert!(heap.update(root).is_some());
    }

    #[test]
    fn long_chain_does_not_recurse() {
        let mut heap = heap(2);
        let mut next = None;
        for value in 0..50_000 {
            next = Some(heap.create(Cons { value, next }).unwrap());
        }
        let root = heap.create(Root { items: vec![next] }).unwrap();
        let report = heap.step(&[ROOT]).unwrap();
        assert_eq!(report.copied_of(CONS), 50_000);
        assert!(report.max_worklist <= 2);
        assert!(heap.update(root).is_some());
    }

    #[test]
    fn update_of_head_ref_is_identity_while_live() {
        let mut heap = heap(2);
        let a = heap.create(Cons { value: 1, next: None }).unwrap();
        assert_eq!(heap.update(a), Some(a));
        heap.destroy(a);
        assert_eq!(heap.update(a), None);
    }

    #[test]
    fn update_only_reaches_one_generation_back() {
        let mut heap = heap(3);
        let a = heap.create(Cons { value: 1, next: None }).unwrap();
        heap.step(&[CONS]).unwrap();
        heap.step(&[CONS]).unwrap();
        assert_eq!(heap.update(a), None);
    }

    #[test]
    fn ring_recycles_after_spares_run_out() {
        let mut heap = heap(3);
        heap.create(Cons { value: 1, next: None }).unwrap();
        let recycled: Vec<bool> = (0..5)
            .map(|_| heap.step(&[CONS]).unwrap().recycled)
            .collect();
        assert_eq!(recycled, vec![false, false, true, true, true]);
        let ids: Vec<u64> = heap.history().map(|g| g.id().0).collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }

    #[test]
    fn cursor_from_old_generation_yields_nothing() {
        let mut heap = heap(2);
        heap.create(Cons { value: 1, next: None }).unwrap();
        let mut cursor = heap.cursor_all::<Cons>().unwrap();
        heap.step(&[CONS]).unwrap();
        assert_eq!(heap.advance(&mut cursor), None);
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn tracing_unregistered_type_panics() {
        let schema = Schema::new().with::<Stray>("stray").unwrap();
        let mut heap = Heap::new(schema, HeapConfig::default()).unwrap();
        let fake = Ref::from_addr(crate::handle::Addr::new(heap.id(), GenerationId(0), 0, 0));
        heap.create(Stray { target: Some(fake) }).unwrap();
        let _ = heap.step(&[KindId(0)]);
    }
}
