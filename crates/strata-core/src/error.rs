//! Error types for the Strata heap.
//!
//! Only caller contract violations are errors. Allocation failure is fatal
//! and never surfaces here, and "gone" references are an ordinary `None`
//! outcome of resolution rather than an error.

use std::error::Error;
use std::fmt;

use crate::id::KindId;

/// Errors returned when a caller misuses the heap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeapError {
    /// The record type was never registered in the heap's schema.
    UnregisteredType {
        /// `std::any::type_name` of the offending type.
        type_name: &'static str,
    },
    /// A kind ordinal that the schema does not define.
    UnknownKind {
        /// The unrecognised kind.
        kind: KindId,
    },
    /// An explicitly supplied kind does not hold the record type used with it.
    KindMismatch {
        /// The kind that was supplied.
        kind: KindId,
        /// Type registered under `kind`.
        registered: &'static str,
        /// Type the caller used.
        requested: &'static str,
    },
    /// The same record type was registered twice.
    DuplicateKind {
        /// `std::any::type_name` of the duplicated type.
        type_name: &'static str,
    },
    /// Heap configuration rejected at construction.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnregisteredType { type_name } => {
                write!(f, "record type {type_name} is not registered")
            }
            Self::UnknownKind { kind } => write!(f, "unknown kind: {kind}"),
            Self::KindMismatch {
                kind,
                registered,
                requested,
            } => {
                write!(f, "kind {kind} holds {registered}, not {requested}")
            }
            Self::DuplicateKind { type_name } => {
                write!(f, "record type {type_name} registered twice")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid heap config: {reason}"),
        }
    }
}

impl Error for HeapError {}
