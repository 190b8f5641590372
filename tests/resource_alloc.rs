use linkpred::{BipartiteGraph, Heuristic, NeighborCache, Scorer};
use stats_alloc::{Region, StatsAlloc, INSTRUMENTED_SYSTEM};
use std::alloc::System;

#[global_allocator]
static GLOBAL: &StatsAlloc<System> = &INSTRUMENTED_SYSTEM;

#[test]
fn neighborhood_scoring_is_allocation_flat() {
    // A "resource consumption" test: overlap heuristics merge sorted cached slices and should
    // not allocate per scored pair. Counting allocations, not RSS, keeps it portable.
    let max_user = 1_000u64;
    let mut edges = Vec::new();
    for u in 1..=200u64 {
        for k in 0..5u64 {
            edges.push((u, max_user + 1 + (u * 7 + k * 13) % 100));
        }
    }
    let g = BipartiteGraph::from_edges(max_user, edges).unwrap();
    let cache = NeighborCache::build(&g).unwrap();
    let pairs: Vec<(u64, u64)> = g
        .users()
        .flat_map(|u| g.venues().take(50).map(move |v| (u, v)))
        .collect();
    assert_eq!(pairs.len(), 10_000);

    for heuristic in [
        Heuristic::CommonNeighborsVenue,
        Heuristic::Jaccard,
        Heuristic::PreferentialAttachment,
        Heuristic::Random { seed: 3 },
    ] {
        let scorer = Scorer::new(&cache, heuristic).unwrap();
        let region = Region::new(&GLOBAL);
        let mut total = 0.0f64;
        for &(u, v) in &pairs {
            total += scorer.score(u, v).unwrap();
        }
        let stats = region.change();
        assert!(total.is_finite());

        // Intentionally coarse: allocator behavior varies by platform. What matters is that
        // the count does not scale with the number of pairs.
        assert!(
            stats.allocations < 100,
            "{heuristic}: {} allocations for {} pairs",
            stats.allocations,
            pairs.len()
        );
    }
}
