use criterion::{criterion_group, criterion_main, Criterion};
use rustc_hash::FxHashMap;
use vgraph::cache::VersionedGraphCache;
use vgraph::executor::DepsAwareExecutor;
use vgraph::graph::{TargetGraph, TargetGraphAndRoots};
use vgraph::resolve::resolve;
use vgraph::smallmap::SmallMap;
use vgraph::version::Version;

/// Layered graph: `layers` rows of `width` nodes, each depending on the
/// whole previous row, with every tenth node reached through a two-version
/// alias.
fn layered_graph(layers: usize, width: usize) -> TargetGraphAndRoots {
    let mut graph = TargetGraph::new();
    let mut prev = Vec::new();
    for layer in 0..layers {
        let mut row = Vec::with_capacity(width);
        for i in 0..width {
            let id = graph.add_plain(&format!("//gen/l{}:n{}", layer, i), prev.clone());
            if i % 10 == 0 {
                let alt = graph.add_plain(&format!("//gen/l{}:n{}.alt", layer, i), prev.clone());
                let mut versions = SmallMap::new();
                versions.insert(Version::of("1"), id);
                versions.insert(Version::of("2"), alt);
                let alias = graph.add_alias(
                    &format!("//gen/l{}:a{}", layer, i),
                    versions,
                    Some(Version::of("1")),
                );
                row.push(alias);
            } else {
                row.push(id);
            }
        }
        prev = row;
    }
    let root = graph.add_plain("//gen:root", prev);
    TargetGraphAndRoots::new(graph, vec![root])
}

pub fn bench_resolve(c: &mut Criterion) {
    let input = layered_graph(20, 50);
    let universes = FxHashMap::default();
    for pool_size in [1, 4] {
        let executor = DepsAwareExecutor::of(pool_size);
        c.bench_function(&format!("resolve pool={}", pool_size), |b| {
            b.iter(|| resolve(&executor, &input, &universes).unwrap())
        });
    }
}

pub fn bench_cache_hit(c: &mut Criterion) {
    let input = layered_graph(20, 50);
    let universes = FxHashMap::default();
    let executor = DepsAwareExecutor::of(4);
    let cache = VersionedGraphCache::new();
    cache
        .get_versioned_graph(&executor, &input, &universes)
        .unwrap();
    c.bench_function("cache hit", |b| {
        b.iter(|| {
            cache
                .get_versioned_graph(&executor, &input, &universes)
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_resolve, bench_cache_hit);
criterion_main!(benches);
