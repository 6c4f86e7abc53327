//! Record kind registry: `TypeId` → [`KindId`].
//!
//! The [`Schema`] is the closed list of record types a heap may hold. Each
//! registered type receives the next kind ordinal, which is also the index
//! of its pool in every generation. The schema is moved into the heap at
//! construction, so the kind set is sealed from then on.

use std::any::{type_name, TypeId};

use indexmap::IndexMap;
use strata_core::{GenerationId, HeapError, HeapId, KindId};

use crate::collector::{scan_record, Collector};
use crate::handle::Addr;
use crate::pool::{ErasedPool, Pool};
use crate::trace::Record;

/// Rewrites the references of one freshly copied record.
pub(crate) type ScanFn = fn(&mut Collector<'_>, KindId, Addr);

type NewPoolFn = fn(HeapId, usize, GenerationId) -> Box<dyn ErasedPool>;

fn new_pool<T: Record>(
    heap: HeapId,
    page_capacity: usize,
    generation: GenerationId,
) -> Box<dyn ErasedPool> {
    Box::new(Pool::<T>::new(heap, page_capacity, generation))
}

/// Per-kind metadata, monomorphised at registration.
struct KindEntry {
    /// Human-readable name (for diagnostics).
    name: &'static str,
    /// `std::any::type_name` of the record type.
    type_name: &'static str,
    new_pool: NewPoolFn,
    scan: ScanFn,
}

/// The set of record kinds a heap can hold.
///
/// Uses `IndexMap` for the type lookup so iteration follows registration
/// order, matching the kind ordinals.
pub struct Schema {
    kinds: Vec<KindEntry>,
    by_type: IndexMap<TypeId, KindId>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self {
            kinds: Vec::new(),
            by_type: IndexMap::new(),
        }
    }

    /// Register `T` under the next kind ordinal.
    ///
    /// Returns `Err(HeapError::DuplicateKind)` if `T` is already registered.
    pub fn register<T: Record>(&mut self, name: &'static str) -> Result<KindId, HeapError> {
        let type_id = TypeId::of::<T>();
        if self.by_type.contains_key(&type_id) {
            return Err(HeapError::DuplicateKind {
                type_name: type_name::<T>(),
            });
        }
        let kind = KindId(self.kinds.len() as u32);
        self.kinds.push(KindEntry {
            name,
            type_name: type_name::<T>(),
            new_pool: new_pool::<T>,
            scan: scan_record::<T>,
        });
        self.by_type.insert(type_id, kind);
        Ok(kind)
    }

    /// Builder form of [`Schema::register`].
    pub fn with<T: Record>(mut self, name: &'static str) -> Result<Self, HeapError> {
        self.register::<T>(name)?;
        Ok(self)
    }

    /// The kind `T` was registered under.
    pub fn kind_of<T: 'static>(&self) -> Result<KindId, HeapError> {
        self.lookup::<T>().ok_or(HeapError::UnregisteredType {
            type_name: type_name::<T>(),
        })
    }

    /// Diagnostic name of a kind.
    pub fn name(&self, kind: KindId) -> Option<&'static str> {
        self.kinds.get(kind.index()).map(|e| e.name)
    }

    /// Whether `kind` is defined by this schema.
    pub fn contains(&self, kind: KindId) -> bool {
        kind.index() < self.kinds.len()
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether no kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Iterate over `(kind, name)` in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = (KindId, &'static str)> + '_ {
        self.kinds
            .iter()
            .enumerate()
            .map(|(i, e)| (KindId(i as u32), e.name))
    }

    pub(crate) fn lookup<T: 'static>(&self) -> Option<KindId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Reject kinds outside the schema.
    pub(crate) fn check_kind(&self, kind: KindId) -> Result<(), HeapError> {
        if self.contains(kind) {
            Ok(())
        } else {
            Err(HeapError::UnknownKind { kind })
        }
    }

    /// Reject an explicit kind that does not hold `T`.
    pub(crate) fn check_type<T: 'static>(&self, kind: KindId) -> Result<(), HeapError> {
        self.check_kind(kind)?;
        if self.lookup::<T>() == Some(kind) {
            Ok(())
        } else {
            Err(HeapError::KindMismatch {
                kind,
                registered: self.kinds[kind.index()].type_name,
                requested: type_name::<T>(),
            })
        }
    }

    /// One empty pool per kind, in ordinal order.
    pub(crate) fn new_pools(
        &self,
        heap: HeapId,
        page_capacity: usize,
        generation: GenerationId,
    ) -> Vec<Box<dyn ErasedPool>> {
        self.kinds
            .iter()
            .map(|e| (e.new_pool)(heap, page_capacity, generation))
            .collect()
    }

    pub(crate) fn scan_fn(&self, kind: KindId) -> ScanFn {
        self.kinds[kind.index()].scan
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::Trace;

    #[derive(Clone)]
    struct Body;
    impl Trace for Body {}

    #[derive(Clone)]
    struct Wheel;
    impl Trace for Wheel {}

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.register::<Body>("body").unwrap();
        schema.register::<Wheel>("wheel").unwrap();
        schema
    }

    #[test]
    fn kinds_assigned_in_registration_order() {
        let schema = schema();
        assert_eq!(schema.kind_of::<Body>(), Ok(KindId(0)));
        assert_eq!(schema.kind_of::<Wheel>(), Ok(KindId(1)));
        assert_eq!(schema.len(), 2);
        let names: Vec<_> = schema.kinds().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["body", "wheel"]);
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut schema = schema();
        let err = schema.register::<Body>("again").unwrap_err();
        assert!(matches!(err, HeapError::DuplicateKind { .. }));
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn unregistered_type_reported() {
        let schema = Schema::new().with::<Body>("body").unwrap();
        assert!(matches!(
            schema.kind_of::<Wheel>(),
            Err(HeapError::UnregisteredType { .. })
        ));
    }

    #[test]
    fn explicit_kind_checked_against_type() {
        let schema = schema();
        assert!(schema.check_type::<Body>(KindId(0)).is_ok());
        assert!(matches!(
            schema.check_type::<Body>(KindId(1)),
            Err(HeapError::KindMismatch {
                kind: KindId(1),
                ..
            })
        ));
        assert_eq!(
            schema.check_type::<Body>(KindId(7)),
            Err(HeapError::UnknownKind { kind: KindId(7) })
        );
    }

    #[test]
    fn new_pools_one_per_kind() {
        let schema = schema();
        let pools = schema.new_pools(HeapId::next(), 16, GenerationId(0));
        assert_eq!(pools.len(), 2);
        assert!(pools.iter().all(|p| p.len() == 0));
        assert_eq!(schema.name(KindId(1)), Some("wheel"));
        assert_eq!(schema.name(KindId(2)), None);
    }
}
