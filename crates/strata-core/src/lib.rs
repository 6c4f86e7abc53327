//! Core types for the Strata generational heap.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! identifiers shared by every layer of the workspace (record kinds,
//! generations and heap instances) and the error type returned when a
//! caller breaks the heap's contract.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;

pub use error::HeapError;
pub use id::{GenerationId, HeapId, KindId};
