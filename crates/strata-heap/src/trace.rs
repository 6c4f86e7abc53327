//! Structural tracing of record references.
//!
//! The collector discovers outgoing references through the [`Trace`] trait
//! rather than through a central table of edges. Each record type visits
//! its `Option<Ref<_>>` fields with a [`Tracer`], which rewrites them in
//! place to point at the new generation (or to `None`).
//!
//! ```ignore
//! #[derive(Clone)]
//! struct Node {
//!     value: u32,
//!     next: Option<Ref<Node>>,
//! }
//!
//! impl Trace for Node {
//!     fn trace(&mut self, tracer: &mut Tracer<'_, '_>) {
//!         self.next.trace(tracer);
//!     }
//! }
//! ```

use crate::collector::Collector;
use crate::handle::Ref;

/// Visits every heap reference held by a value.
///
/// The default implementation visits nothing, which is correct for leaf
/// records that hold no references.
pub trait Trace {
    /// Pass every `Option<Ref<_>>` reachable from `self` to `tracer`.
    fn trace(&mut self, tracer: &mut Tracer<'_, '_>) {
        let _ = tracer;
    }
}

/// A type that can live in a heap pool.
///
/// Blanket-implemented for every `Trace + Clone + 'static` type. `Clone` is
/// how a step copies a record into the next generation.
pub trait Record: Trace + Clone + 'static {}

impl<T: Trace + Clone + 'static> Record for T {}

/// Handle through which [`Trace`] implementations report their references.
///
/// Only the collector constructs tracers.
pub struct Tracer<'c, 'h> {
    collector: &'c mut Collector<'h>,
}

impl<'c, 'h> Tracer<'c, 'h> {
    pub(crate) fn new(collector: &'c mut Collector<'h>) -> Self {
        Self { collector }
    }

    /// Rewrite one reference field for the new generation.
    ///
    /// The target is copied on first visit and reused on every later visit
    /// within the same step. Targets that were destroyed, or that the old
    /// generation never issued, become `None`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not registered in the heap's schema.
    pub fn edge<T: Record>(&mut self, field: &mut Option<Ref<T>>) {
        if let Some(r) = *field {
            *field = self.collector.transfer_ref(r);
        }
    }
}

impl<T: Record> Trace for Option<Ref<T>> {
    fn trace(&mut self, tracer: &mut Tracer<'_, '_>) {
        tracer.edge(self);
    }
}

impl<T: Trace> Trace for Vec<T> {
    fn trace(&mut self, tracer: &mut Tracer<'_, '_>) {
        for item in self.iter_mut() {
            item.trace(tracer);
        }
    }
}

impl<T: Trace, const N: usize> Trace for [T; N] {
    fn trace(&mut self, tracer: &mut Tracer<'_, '_>) {
        for item in self.iter_mut() {
            item.trace(tracer);
        }
    }
}

impl<T: Trace> Trace for Box<T> {
    fn trace(&mut self, tracer: &mut Tracer<'_, '_>) {
        (**self).trace(tracer);
    }
}
