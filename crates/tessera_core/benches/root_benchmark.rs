//! # Engine Root Benchmark
//!
//! Measures the structural operations of the root:
//! - Build and submit with and without preallocation
//! - Point lookups and bulk iteration
//! - Group swaps and bulk group removal
//!
//! Run with: `cargo bench --package tessera_core`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tessera_core::{
    BuildView, EngineRootCore, EntityDescriptor, EntityId, EntityView, GroupId, Implementors,
    View,
};

/// Entities per benchmark iteration.
const ENTITY_COUNT: u32 = 10_000;

struct Position {
    id: EntityId,
    x: f32,
    y: f32,
}

impl EntityView for Position {
    fn entity_id(&self) -> EntityId {
        self.id
    }
}

impl View for Position {}

impl BuildView for Position {
    fn build(id: EntityId, _implementors: &Implementors) -> Self {
        Self { id, x: 0.0, y: 0.0 }
    }
}

struct Velocity {
    id: EntityId,
    dx: f32,
}

impl EntityView for Velocity {
    fn entity_id(&self) -> EntityId {
        self.id
    }
}

impl View for Velocity {}

impl BuildView for Velocity {
    fn build(id: EntityId, _implementors: &Implementors) -> Self {
        Self { id, dx: 1.0 }
    }
}

fn descriptor() -> EntityDescriptor {
    EntityDescriptor::new("mover")
        .with::<Position>()
        .with::<Velocity>()
}

fn filled(count: u32, group: GroupId) -> EngineRootCore {
    let mut root = EngineRootCore::default();
    let descriptor = descriptor();
    let implementors = Implementors::new();
    for i in 0..count {
        let _ = root.build_entity_in_group(EntityId(i), group, &descriptor, &implementors);
    }
    let _ = root.submit_entity_views();
    root
}

/// Benchmark: build then submit, cold and preallocated.
fn bench_build_submit(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_submit");
    let descriptor = descriptor();
    let implementors = Implementors::new();

    for preallocate in [false, true] {
        group.bench_with_input(
            BenchmarkId::new("preallocated", preallocate),
            &preallocate,
            |b, &preallocate| {
                b.iter(|| {
                    let mut root = EngineRootCore::default();
                    if preallocate {
                        let _ = root.preallocate(GroupId(1), ENTITY_COUNT as usize, &descriptor);
                    }
                    for i in 0..ENTITY_COUNT {
                        let _ = root.build_entity_in_group(
                            EntityId(i),
                            GroupId(1),
                            &descriptor,
                            &implementors,
                        );
                    }
                    black_box(root.submit_entity_views())
                });
            },
        );
    }

    group.finish();
}

/// Benchmark: point lookup versus bulk iteration.
fn bench_queries(c: &mut Criterion) {
    let root = filled(ENTITY_COUNT, GroupId(1));
    let mut group = c.benchmark_group("queries");

    group.bench_function("point_lookup_10K", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for i in 0..ENTITY_COUNT {
                if let Some(position) = root.query_entity_view::<Position>(EntityId(i), GroupId(1)) {
                    sum += position.read().x;
                }
            }
            black_box(sum)
        });
    });

    group.bench_function("group_iteration_10K", |b| {
        b.iter(|| {
            for (position, velocity) in root
                .query_group_views::<Position>(GroupId(1))
                .iter()
                .zip(root.query_group_views::<Velocity>(GroupId(1)))
            {
                let dx = velocity.read().dx;
                let mut position = position.write();
                position.x += dx;
                position.y += dx;
            }
            black_box(root.query_views::<Position>().len())
        });
    });

    group.finish();
}

/// Benchmark: move every entity to another group and back.
fn bench_swap_groups(c: &mut Criterion) {
    c.bench_function("swap_round_trip_10K", |b| {
        let mut root = filled(ENTITY_COUNT, GroupId(1));
        b.iter(|| {
            for i in 0..ENTITY_COUNT {
                let _ = root.swap_entity_group(EntityId(i), GroupId(1), GroupId(2));
            }
            for i in 0..ENTITY_COUNT {
                let _ = root.swap_entity_group(EntityId(i), GroupId(2), GroupId(1));
            }
            black_box(root.entity_count(GroupId(1)))
        });
    });
}

/// Benchmark: bulk group removal.
fn bench_remove_group(c: &mut Criterion) {
    c.bench_function("remove_group_10K", |b| {
        b.iter_batched(
            || filled(ENTITY_COUNT, GroupId(1)),
            |mut root| black_box(root.remove_group_and_entities(GroupId(1))),
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_build_submit,
    bench_queries,
    bench_swap_groups,
    bench_remove_group,
);
criterion_main!(benches);
