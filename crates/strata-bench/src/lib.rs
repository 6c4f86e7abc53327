//! Benchmark profiles for the Strata generational heap.
//!
//! Each profile fills a fresh heap with a fixed record graph and returns it
//! ready to step:
//!
//! - [`chain_profile`]: one long `next` chain, the worst case for scan depth
//! - [`tree_profile`]: a full binary tree with parent links
//! - [`random_graph_profile`]: seeded random ring edges with garbage mixed in

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_heap::{Heap, Ref};
use strata_test_utils::fixtures::{build_ring, build_tree};
use strata_test_utils::{Anchor, Ring, TestHeapBuilder};

/// Page size used by every profile.
pub const PROFILE_PAGE_CAPACITY: usize = 256;

fn profile_heap() -> Heap {
    TestHeapBuilder::new()
        .depth(2)
        .page_capacity(PROFILE_PAGE_CAPACITY)
        .build()
}

fn anchor(heap: &mut Heap, value: Anchor) -> Ref<Anchor> {
    heap.create(value).expect("anchor is registered")
}

/// A single ring of `len` nodes held by one anchor.
pub fn chain_profile(len: u32) -> Heap {
    let mut heap = profile_heap();
    let ring = build_ring(&mut heap, len);
    anchor(
        &mut heap,
        Anchor {
            ring: ring.first().copied(),
            ..Anchor::default()
        },
    );
    heap
}

/// A full binary tree of the given depth held by one anchor.
pub fn tree_profile(depth: u32) -> Heap {
    let mut heap = profile_heap();
    let root = build_tree(&mut heap, depth);
    anchor(
        &mut heap,
        Anchor {
            tree: Some(root),
            ..Anchor::default()
        },
    );
    heap
}

/// `nodes` ring records with seeded random `next` edges.
///
/// `anchors` anchors point at random nodes, so roughly the part of the
/// graph they reach survives a step and the rest is garbage.
pub fn random_graph_profile(nodes: u32, anchors: u32, seed: u64) -> Heap {
    assert!(nodes > 0, "random graph needs at least one node");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut heap = profile_heap();
    let refs: Vec<Ref<Ring>> = (0..nodes)
        .map(|label| heap.create(Ring { label, next: None }).expect("ring is registered"))
        .collect();
    for &r in &refs {
        // One in eight nodes ends its chain.
        if rng.next_u32() % 8 == 0 {
            continue;
        }
        let target = refs[(rng.next_u32() % nodes) as usize];
        heap.get_mut(r).expect("fresh node").next = Some(target);
    }
    for _ in 0..anchors {
        let target = refs[(rng.next_u32() % nodes) as usize];
        anchor(
            &mut heap,
            Anchor {
                ring: Some(target),
                ..Anchor::default()
            },
        );
    }
    heap
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_test_utils::fixtures::tree_size;
    use strata_test_utils::{ANCHOR, TreeNode};

    #[test]
    fn chain_profile_survives_step() {
        let mut heap = chain_profile(1_000);
        let report = heap.step(&[ANCHOR]).unwrap();
        assert_eq!(report.copied, 1_001);
        assert_eq!(report.dropped, 0);
    }

    #[test]
    fn tree_profile_size() {
        let heap = tree_profile(4);
        assert_eq!(heap.len::<TreeNode>(), Ok(tree_size(4)));
    }

    #[test]
    fn random_graph_deterministic() {
        let mut a = random_graph_profile(500, 4, 42);
        let mut b = random_graph_profile(500, 4, 42);
        let ra = a.step(&[ANCHOR]).unwrap();
        let rb = b.step(&[ANCHOR]).unwrap();
        assert_eq!(ra, rb);
        assert!(ra.copied <= 504);
    }
}
