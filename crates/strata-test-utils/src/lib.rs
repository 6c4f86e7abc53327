//! Test utilities for Strata development.
//!
//! Provides a fixed record schema ([`fixtures`]) with self-referencing,
//! tree-shaped, leaf and anchor kinds, graph builders over it, and a
//! [`TestHeapBuilder`] for constructing heaps in tests and benches.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use strata_heap::{Heap, HeapConfig};

pub use fixtures::{Anchor, Leaf, Ring, TreeNode, ANCHOR, LEAF, RING, TREE};

/// Builder for heaps over [`fixtures::test_schema`].
pub struct TestHeapBuilder {
    config: HeapConfig,
}

impl TestHeapBuilder {
    pub fn new() -> Self {
        Self {
            config: HeapConfig::default(),
        }
    }

    /// Ring depth (K).
    pub fn depth(mut self, depth: usize) -> Self {
        self.config.depth = depth;
        self
    }

    /// Slots per page (N). Small pages exercise page-boundary paths.
    pub fn page_capacity(mut self, page_capacity: usize) -> Self {
        self.config.page_capacity = page_capacity;
        self
    }

    pub fn build(self) -> Heap {
        Heap::new(fixtures::test_schema(), self.config).expect("test heap config is valid")
    }
}

impl Default for TestHeapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A depth-2 heap with 4-slot pages.
pub fn small_heap() -> Heap {
    TestHeapBuilder::new().depth(2).page_capacity(4).build()
}
