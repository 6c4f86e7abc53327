//! Criterion micro-benchmarks for record creation, iteration and stepping.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use strata_bench::{chain_profile, random_graph_profile, tree_profile};
use strata_test_utils::{Leaf, TestHeapBuilder, ANCHOR, LEAF};

/// Benchmark: create 10K leaves into a fresh heap.
fn bench_create_10k(c: &mut Criterion) {
    c.bench_function("create_10k", |b| {
        b.iter_batched(
            || TestHeapBuilder::new().page_capacity(256).build(),
            |mut heap| {
                for value in 0..10_000u64 {
                    black_box(heap.create(Leaf { value }).unwrap());
                }
                heap
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: destroy every other leaf of a 10K-leaf heap.
fn bench_destroy_5k(c: &mut Criterion) {
    c.bench_function("destroy_5k", |b| {
        b.iter_batched(
            || {
                let mut heap = TestHeapBuilder::new().page_capacity(256).build();
                let refs: Vec<_> = (0..10_000u64)
                    .map(|value| heap.create(Leaf { value }).unwrap())
                    .collect();
                (heap, refs)
            },
            |(mut heap, refs)| {
                for r in refs.iter().step_by(2) {
                    black_box(heap.destroy(*r));
                }
                heap
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: iterate 10K live leaves, half of the pool destroyed.
fn bench_iter_sparse_10k(c: &mut Criterion) {
    let mut heap = TestHeapBuilder::new().page_capacity(256).build();
    let refs: Vec<_> = (0..20_000u64)
        .map(|value| heap.create(Leaf { value }).unwrap())
        .collect();
    for r in refs.iter().step_by(2) {
        heap.destroy(*r);
    }

    c.bench_function("iter_sparse_10k", |b| {
        b.iter(|| {
            let sum: u64 = heap
                .iter_current::<Leaf>()
                .unwrap()
                .map(|r| heap.get(r).unwrap().value)
                .sum();
            black_box(sum);
        });
    });
}

/// Benchmark: steady-state step of a 10K-leaf heap (pages recycled).
fn bench_step_leaves_10k(c: &mut Criterion) {
    let mut heap = TestHeapBuilder::new().page_capacity(256).build();
    for value in 0..10_000u64 {
        heap.create(Leaf { value }).unwrap();
    }
    // Fill the spare generation so the loop measures recycling.
    heap.step(&[LEAF]).unwrap();

    c.bench_function("step_leaves_10k", |b| {
        b.iter(|| black_box(heap.step(&[LEAF]).unwrap()));
    });
}

/// Benchmark: step a 100K-node chain.
fn bench_step_chain_100k(c: &mut Criterion) {
    let mut heap = chain_profile(100_000);
    heap.step(&[ANCHOR]).unwrap();

    c.bench_function("step_chain_100k", |b| {
        b.iter(|| black_box(heap.step(&[ANCHOR]).unwrap()));
    });
}

/// Benchmark: step a depth-14 binary tree (32K nodes).
fn bench_step_tree_d14(c: &mut Criterion) {
    let mut heap = tree_profile(14);
    heap.step(&[ANCHOR]).unwrap();

    c.bench_function("step_tree_d14", |b| {
        b.iter(|| black_box(heap.step(&[ANCHOR]).unwrap()));
    });
}

/// Benchmark: first step over a random graph with garbage, from scratch.
fn bench_step_random_graph_50k(c: &mut Criterion) {
    c.bench_function("step_random_graph_50k", |b| {
        b.iter_batched(
            || random_graph_profile(50_000, 16, 7),
            |mut heap| {
                black_box(heap.step(&[ANCHOR]).unwrap());
                heap
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_create_10k,
    bench_destroy_5k,
    bench_iter_sparse_10k,
    bench_step_leaves_10k,
    bench_step_chain_100k,
    bench_step_tree_d14,
    bench_step_random_graph_50k
);
criterion_main!(benches);
