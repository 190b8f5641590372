//! Descriptive graph statistics (numbers only; plotting is left to callers).

use std::collections::BTreeMap;

use crate::graph::BipartiteGraph;

/// Degree → fraction of nodes with that degree. Empty for an empty graph.
pub fn degree_distribution(graph: &BipartiteGraph) -> BTreeMap<usize, f64> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for node in graph.nodes() {
        if let Ok(d) = graph.degree(node) {
            *counts.entry(d).or_insert(0) += 1;
        }
    }
    let n = graph.node_count() as f64;
    counts.into_iter().map(|(d, c)| (d, c as f64 / n)).collect()
}

/// Component size → number of components of that size.
pub fn component_size_histogram(graph: &BipartiteGraph) -> BTreeMap<usize, usize> {
    let mut hist = BTreeMap::new();
    for comp in graph.connected_components() {
        *hist.entry(comp.len()).or_insert(0) += 1;
    }
    hist
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub users: usize,
    pub venues: usize,
    pub components: usize,
    pub largest_component: usize,
}

impl GraphSummary {
    pub fn of(graph: &BipartiteGraph) -> Self {
        let comps = graph.connected_components();
        let (users, venues) = graph.partition_counts();
        Self {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            users,
            venues,
            components: comps.len(),
            largest_component: comps.iter().map(Vec::len).max().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BipartiteGraph {
        // Path 1-101-2 and edge 3-102.
        BipartiteGraph::from_edges(100, [(1, 101), (2, 101), (3, 102)]).unwrap()
    }

    #[test]
    fn degree_fractions_sum_to_one() {
        let dist = degree_distribution(&sample());
        assert_eq!(dist.len(), 2);
        assert!((dist[&1] - 0.8).abs() < 1e-12);
        assert!((dist[&2] - 0.2).abs() < 1e-12);
        let total: f64 = dist.values().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn component_histogram() {
        let hist = component_size_histogram(&sample());
        assert_eq!(hist.get(&3), Some(&1));
        assert_eq!(hist.get(&2), Some(&1));
    }

    #[test]
    fn summary() {
        let s = GraphSummary::of(&sample());
        assert_eq!(
            s,
            GraphSummary { nodes: 5, edges: 3, users: 3, venues: 2, components: 2, largest_component: 3 }
        );
        assert_eq!(GraphSummary::of(&BipartiteGraph::new(1)), GraphSummary::default());
        assert!(degree_distribution(&BipartiteGraph::new(1)).is_empty());
    }
}
