//! Mark-and-copy collection from one generation into the next.
//!
//! The collector walks the live records of every root kind in the old
//! generation and transfers each one. A transfer copies the record into the
//! new generation once, stores the new address in the old slot's remap, and
//! schedules the copy for scanning. Scanning runs the record's [`Trace`]
//! implementation, which transfers every referenced record in turn.
//!
//! Scheduled copies live on an explicit stack rather than the call stack,
//! so reference chains of any length are traced in constant native stack.

use smallvec::{smallvec, SmallVec};
use strata_core::KindId;

use crate::generation::Generation;
use crate::handle::{Addr, Ref};
use crate::pool::SlotState;
use crate::schema::Schema;
use crate::trace::{Record, Trace, Tracer};

/// Counters gathered during one collection.
#[derive(Clone, Debug, Default)]
pub(crate) struct CollectStats {
    /// Records copied, indexed by kind ordinal.
    pub(crate) copied_per_kind: SmallVec<[usize; 8]>,
    /// Deepest the pending-scan stack grew.
    pub(crate) max_worklist: usize,
}

/// State of one step: the generation being copied from and the one being
/// filled.
pub(crate) struct Collector<'h> {
    schema: &'h Schema,
    from: &'h mut Generation,
    to: &'h mut Generation,
    /// Copies in `to` whose references have not been rewritten yet.
    worklist: Vec<(KindId, Addr)>,
    stats: CollectStats,
}

impl<'h> Collector<'h> {
    pub(crate) fn new(
        schema: &'h Schema,
        from: &'h mut Generation,
        to: &'h mut Generation,
    ) -> Self {
        Self {
            schema,
            from,
            to,
            worklist: Vec::new(),
            stats: CollectStats {
                copied_per_kind: smallvec![0; schema.len()],
                max_worklist: 0,
            },
        }
    }

    /// Transfer every live record of each root kind, in the order given.
    ///
    /// Root kinds must already be validated against the schema.
    pub(crate) fn run(mut self, roots: &[KindId]) -> CollectStats {
        for &kind in roots {
            // Re-reads the pool's peak on every advance, like `cursor_all`.
            let mut position = 0;
            while let Some((index, addr)) = self.from.pool(kind).next_live_addr(position) {
                position = index + 1;
                self.transfer(kind, addr);
                self.drain();
            }
        }
        self.stats
    }

    /// Scan scheduled copies until none remain.
    fn drain(&mut self) {
        while let Some((kind, addr)) = self.worklist.pop() {
            let scan = self.schema.scan_fn(kind);
            scan(self, kind, addr);
        }
    }

    /// Resolve `addr` in the old generation to its new-generation address.
    ///
    /// Returns `None` for addresses the old pool never issued and for
    /// records destroyed before the step.
    pub(crate) fn transfer(&mut self, kind: KindId, addr: Addr) -> Option<Addr> {
        let (page, slot) = match self.from.pool(kind).slot_state(addr) {
            SlotState::Missing | SlotState::Dead => return None,
            SlotState::Forwarded(to) => return Some(to),
            SlotState::Unvisited { page, slot } => (page, slot),
        };

        let to = self
            .from
            .pool(kind)
            .copy_into(page, slot, self.to.pool_mut(kind));
        // Setting the remap before scanning is what terminates cycles.
        self.from.pool_mut(kind).set_remap(page, slot, to);

        self.stats.copied_per_kind[kind.index()] += 1;
        self.worklist.push((kind, to));
        self.stats.max_worklist = self.stats.max_worklist.max(self.worklist.len());
        Some(to)
    }

    /// Typed [`Collector::transfer`] used by [`Tracer::edge`].
    ///
    /// # Panics
    ///
    /// Panics if `T` is not registered in the schema.
    pub(crate) fn transfer_ref<T: Record>(&mut self, r: Ref<T>) -> Option<Ref<T>> {
        let Some(kind) = self.schema.lookup::<T>() else {
            panic!(
                "record type {} is referenced but not registered in the schema",
                std::any::type_name::<T>()
            );
        };
        self.transfer(kind, r.addr()).map(Ref::from_addr)
    }
}

/// Rewrite the references of the copy at `addr` in the new generation.
///
/// The payload is moved out of its slot while it is traced so the tracer
/// can allocate into the same pool.
pub(crate) fn scan_record<T: Record>(collector: &mut Collector<'_>, kind: KindId, addr: Addr) {
    let Some(mut record) = collector.to.typed_pool_mut::<T>(kind).take(addr) else {
        return;
    };
    record.trace(&mut Tracer::new(collector));
    collector.to.typed_pool_mut::<T>(kind).restore(addr, record);
}
