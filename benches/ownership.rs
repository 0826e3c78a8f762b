//! Benchmarks for effective-ownership resolution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use orgweave::config::EngineConfig;
use orgweave::engine::Engine;
use orgweave::graph::NewShareholding;
use orgweave::ids::OrgId;

/// `layers` levels of `width` organizations; every org holds a stake in
/// every org of the next level.
fn layered(layers: usize, width: usize) -> (Engine, OrgId) {
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let root = engine
        .hierarchy()
        .create_organization("root", None, 1)
        .unwrap()
        .id;

    let mut previous = vec![root];
    for layer in 0..layers {
        let current: Vec<OrgId> = (0..width)
            .map(|i| {
                engine
                    .hierarchy()
                    .create_organization(&format!("L{layer}-{i}"), None, 1)
                    .unwrap()
                    .id
            })
            .collect();
        let share = (10_000 / width) as u32;
        for &parent in &previous {
            for &child in &current {
                engine
                    .ownership()
                    .record_shareholding(NewShareholding::new(parent, child, share))
                    .unwrap();
            }
        }
        previous = current;
    }
    (engine, root)
}

fn bench_chain(c: &mut Criterion) {
    let (engine, root) = layered(10, 1);
    c.bench_function("ownership_chain_10", |bench| {
        bench.iter(|| black_box(engine.ownership().effective_ownership(root).unwrap()))
    });
}

fn bench_layered(c: &mut Criterion) {
    let (engine, root) = layered(4, 4);
    c.bench_function("ownership_layered_4x4", |bench| {
        bench.iter(|| black_box(engine.ownership().effective_ownership(root).unwrap()))
    });
    c.bench_function("holdings_layered_4x4", |bench| {
        bench.iter(|| black_box(engine.ownership().holdings(root, 10).unwrap()))
    });
}

criterion_group!(benches, bench_chain, bench_layered);
criterion_main!(benches);
