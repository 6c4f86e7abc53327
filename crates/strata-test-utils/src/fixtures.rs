//! Reusable record kinds and graph builders.
//!
//! The schema registers four kinds in a fixed order, so their ordinals are
//! available as constants:
//!
//! - [`Ring`]: one outgoing reference to its own kind; builds cycles.
//! - [`TreeNode`]: parent pointer plus two children.
//! - [`Leaf`]: no references.
//! - [`Anchor`]: the usual root kind, pointing at the others.

use strata_core::KindId;
use strata_heap::{Heap, Ref, Schema, Trace, Tracer};

pub const RING: KindId = KindId(0);
pub const TREE: KindId = KindId(1);
pub const LEAF: KindId = KindId(2);
pub const ANCHOR: KindId = KindId(3);

#[derive(Clone, Debug, PartialEq)]
pub struct Ring {
    pub label: u32,
    pub next: Option<Ref<Ring>>,
}

impl Trace for Ring {
    fn trace(&mut self, tracer: &mut Tracer<'_, '_>) {
        self.next.trace(tracer);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode {
    pub depth: u32,
    pub parent: Option<Ref<TreeNode>>,
    pub children: [Option<Ref<TreeNode>>; 2],
}

impl Trace for TreeNode {
    fn trace(&mut self, tracer: &mut Tracer<'_, '_>) {
        self.parent.trace(tracer);
        self.children.trace(tracer);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Leaf {
    pub value: u64,
}

impl Trace for Leaf {}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Anchor {
    pub ring: Option<Ref<Ring>>,
    pub tree: Option<Ref<TreeNode>>,
    pub leaves: Vec<Option<Ref<Leaf>>>,
}

impl Trace for Anchor {
    fn trace(&mut self, tracer: &mut Tracer<'_, '_>) {
        self.ring.trace(tracer);
        self.tree.trace(tracer);
        self.leaves.trace(tracer);
    }
}

/// Schema with [`RING`], [`TREE`], [`LEAF`] and [`ANCHOR`] in that order.
pub fn test_schema() -> Schema {
    let mut schema = Schema::new();
    for (expected, kind) in [
        (RING, schema.register::<Ring>("ring")),
        (TREE, schema.register::<TreeNode>("tree")),
        (LEAF, schema.register::<Leaf>("leaf")),
        (ANCHOR, schema.register::<Anchor>("anchor")),
    ] {
        assert_eq!(kind, Ok(expected));
    }
    schema
}

/// Create `len` ring nodes labelled `0..len`, each pointing at the next and
/// the last pointing back at the first.
pub fn build_ring(heap: &mut Heap, len: u32) -> Vec<Ref<Ring>> {
    let nodes: Vec<_> = (0..len)
        .map(|label| heap.create(Ring { label, next: None }).expect("ring is registered"))
        .collect();
    for (i, &node) in nodes.iter().enumerate() {
        let next = nodes[(i + 1) % nodes.len()];
        heap.get_mut(node).expect("just created").next = Some(next);
    }
    nodes
}

/// Follow `next` from `start` until it comes back around, hits `None`, or
/// `limit` nodes have been visited.
pub fn walk_ring(heap: &Heap, start: Ref<Ring>, limit: usize) -> Vec<Ref<Ring>> {
    let mut seen = vec![start];
    let mut at = start;
    while seen.len() < limit {
        match heap.get(at).and_then(|n| n.next) {
            Some(next) if next == start => break,
            Some(next) => {
                seen.push(next);
                at = next;
            }
            None => break,
        }
    }
    seen
}

/// Number of nodes in a full binary tree with `depth` levels below the root.
pub fn tree_size(depth: u32) -> usize {
    (1usize << (depth + 1)) - 1
}

/// Build a full binary tree with `depth` levels below the root. Every node
/// points at its parent and children. Returns the root.
pub fn build_tree(heap: &mut Heap, depth: u32) -> Ref<TreeNode> {
    let root = heap
        .create(TreeNode {
            depth: 0,
            parent: None,
            children: [None, None],
        })
        .expect("tree is registered");
    let mut frontier = vec![root];
    while let Some(node) = frontier.pop() {
        let level = heap.get(node).expect("live node").depth;
        if level >= depth {
            continue;
        }
        for i in 0..2 {
            let child = heap
                .create(TreeNode {
                    depth: level + 1,
                    parent: Some(node),
                    children: [None, None],
                })
                .expect("tree is registered");
            heap.get_mut(node).expect("live node").children[i] = Some(child);
            frontier.push(child);
        }
    }
    root
}

/// Parent hops from `node` to a parentless node, or `None` past `limit`.
pub fn hops_to_root(
    heap: &Heap,
    node: Ref<TreeNode>,
    limit: usize,
) -> Option<(usize, Ref<TreeNode>)> {
    let mut at = node;
    for hops in 0..=limit {
        match heap.get(at)?.parent {
            Some(parent) => at = parent,
            None => return Some((hops, at)),
        }
    }
    None
}

/// Create an anchor holding `leaves` fresh leaves and nothing else.
pub fn anchor_with_leaves(heap: &mut Heap, leaves: u64) -> Ref<Anchor> {
    let leaves = (0..leaves)
        .map(|value| Some(heap.create(Leaf { value }).expect("leaf is registered")))
        .collect();
    heap.create(Anchor {
        leaves,
        ..Anchor::default()
    })
    .expect("anchor is registered")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::small_heap;

    #[test]
    fn ring_closes_on_itself() {
        let mut heap = small_heap();
        let nodes = build_ring(&mut heap, 5);
        assert_eq!(walk_ring(&heap, nodes[0], 100), nodes);
    }

    #[test]
    fn tree_has_full_node_count() {
        let mut heap = small_heap();
        build_tree(&mut heap, 3);
        assert_eq!(heap.len::<TreeNode>(), Ok(tree_size(3)));
    }

    #[test]
    fn deepest_node_reaches_root() {
        let mut heap = small_heap();
        let root = build_tree(&mut heap, 4);
        let deepest = heap
            .iter_current::<TreeNode>()
            .unwrap()
            .find(|&n| heap.get(n).unwrap().depth == 4)
            .unwrap();
        assert_eq!(hops_to_root(&heap, deepest, 4), Some((4, root)));
    }
}
