//! # Record Pool Benchmark
//!
//! Structural operations must stay O(1) whatever the pool size.
//!
//! Run with: `cargo bench --package tessera_core --bench pool_benchmark`

// Benchmarks don't need docs
#![allow(missing_docs)]

use bytemuck::{Pod, Zeroable};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessera_core::{Component, RecordPool, SlotId};

#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct Body {
    position: [f32; 3],
    velocity: [f32; 3],
}

impl Component for Body {
    const ID: u8 = 0;
    const NAME: &'static str = "Body";
}

fn filled(capacity: usize) -> (RecordPool<Body>, Vec<SlotId>) {
    let mut pool = RecordPool::new(capacity).expect("capacity is non-zero");
    let ids = (0..capacity)
        .map(|_| pool.allocate().expect("pool has room"))
        .collect();
    (pool, ids)
}

/// Benchmark: fill and drain a pool.
fn bench_allocate_free(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_free");

    for capacity in [1_000, 10_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                let mut pool: RecordPool<Body> = RecordPool::new(capacity).expect("capacity");
                let mut ids = Vec::with_capacity(capacity);
                b.iter(|| {
                    for _ in 0..capacity {
                        ids.push(pool.allocate().expect("pool has room"));
                    }
                    for id in ids.drain(..) {
                        pool.free(id).expect("allocated");
                    }
                    black_box(pool.allocated_count())
                });
            },
        );
    }

    group.finish();
}

/// Benchmark: random activation churn on a full pool.
fn bench_activation_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("activation_churn");

    for capacity in [1_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                let (mut pool, ids) = filled(capacity);
                let mut rng = ChaCha8Rng::seed_from_u64(42);
                let picks: Vec<SlotId> = (0..10_000)
                    .map(|_| ids[rng.gen_range(0..ids.len())])
                    .collect();

                b.iter(|| {
                    for (i, &id) in picks.iter().enumerate() {
                        if i % 2 == 0 {
                            pool.activate(id).expect("allocated");
                        } else {
                            pool.deactivate(id).expect("allocated");
                        }
                    }
                    black_box(pool.active_count())
                });
            },
        );
    }

    group.finish();
}

/// Benchmark: sweep over the packed active run.
fn bench_active_sweep(c: &mut Criterion) {
    let (mut pool, ids) = filled(100_000);
    for id in ids.iter().step_by(2) {
        pool.activate(*id).expect("allocated");
    }

    c.bench_function("active_sweep_50k", |b| {
        b.iter(|| {
            for body in pool.active_mut() {
                for axis in 0..3 {
                    body.position[axis] += body.velocity[axis] * 0.016;
                }
            }
            black_box(pool.active_bytes().len())
        });
    });
}

criterion_group!(
    benches,
    bench_allocate_free,
    bench_activation_churn,
    bench_active_sweep,
);

criterion_main!(benches);
