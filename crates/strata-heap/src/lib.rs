//! Generational tracing/copying snapshot heap.
//!
//! A [`Heap`] owns a fixed-depth ring of generations. Each generation holds
//! one typed [`Pool`] per record kind registered in the [`Schema`]. Calling
//! [`Heap::step`] produces the next generation by copying every record
//! reachable from the root kinds, deduplicating shared targets and nulling
//! references to destroyed or unreachable records. The oldest generation's
//! storage is recycled wholesale to hold the new one.
//!
//! # Architecture
//!
//! ```text
//! Heap (orchestrator)
//! ├── Schema (TypeId → KindId, sealed at construction)
//! └── Generation × depth (ring, newest → oldest via `prev`)
//!     └── Pool<T> per kind → Page<T>[] (N slots + live + remap)
//! ```
//!
//! # Stepping
//!
//! 1. Recycle a spare generation, or the oldest one in the chain.
//! 2. Link it in front of the current head.
//! 3. For each root kind, transfer every live record of the old head.
//! 4. Transfers copy once, record the new address in the old slot's remap
//!    and scan the copy's references through [`Trace`], using an explicit
//!    worklist instead of recursion.
//!
//! External references survive a step only through [`Heap::update`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod collector;
pub mod config;
pub mod generation;
pub mod handle;
pub mod heap;
pub mod page;
pub mod pool;
pub mod schema;
pub mod trace;

// Public re-exports for the primary API surface.
pub use config::HeapConfig;
pub use generation::GenerationView;
pub use handle::{Addr, Ref};
pub use heap::{Heap, History, StepReport};
pub use pool::{Cursor, Iter, Pool};
pub use schema::Schema;
pub use strata_core::{GenerationId, HeapError, HeapId, KindId};
pub use trace::{Record, Trace, Tracer};
