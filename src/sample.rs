//! Degree-threshold reduction (k-core peeling) on the largest connected component.
//!
//! Deleting the nodes below the threshold can push their neighbors below it too, so peeling
//! repeats in whole batches until a round deletes nothing.
//!
//! On check-in data the peeled graph usually stays a single component. That is an empirical
//! observation, not an invariant of peeling; [`PeelReport::connected`] records whether it held
//! and a warning is logged when it did not.

use tracing::{debug, info, warn};

use crate::graph::{BipartiteGraph, Edge, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeelConfig {
    /// Nodes with degree strictly below this are removed.
    pub min_degree: usize,
}

impl Default for PeelConfig {
    fn default() -> Self {
        Self { min_degree: 2 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeelStats {
    /// Rounds that removed at least one node.
    pub rounds: usize,
    /// Nodes removed by the degree rounds.
    pub removed_nodes: usize,
    pub removed_edges: usize,
    /// Nodes outside the largest component, dropped before peeling. Always 0 for
    /// [`peel_in_place`].
    pub lcc_removed_nodes: usize,
    pub lcc_removed_edges: usize,
}

impl PeelStats {
    pub fn total_removed_nodes(&self) -> usize {
        self.removed_nodes + self.lcc_removed_nodes
    }

    pub fn total_removed_edges(&self) -> usize {
        self.removed_edges + self.lcc_removed_edges
    }
}

#[derive(Debug, Clone)]
pub struct PeelReport {
    pub graph: BipartiteGraph,
    pub stats: PeelStats,
    pub users: usize,
    pub venues: usize,
    pub connected: bool,
}

impl PeelReport {
    /// The reduced edge list, user-first.
    pub fn edges(&self) -> Vec<Edge> {
        self.graph.edges().collect()
    }
}

/// Peel `graph` in place to the fixpoint where every node has degree `>= min_degree`.
///
/// Peeling an already-peeled graph with the same threshold changes nothing.
pub fn peel_in_place(graph: &mut BipartiteGraph, min_degree: usize) -> PeelStats {
    let mut stats = PeelStats::default();
    loop {
        let doomed: Vec<NodeId> = graph
            .nodes()
            .filter(|&n| graph.degree(n).is_ok_and(|d| d < min_degree))
            .collect();
        if doomed.is_empty() {
            break;
        }
        let removed_edges = graph.remove_nodes(&doomed);
        stats.rounds += 1;
        stats.removed_nodes += doomed.len();
        stats.removed_edges += removed_edges;
        debug!(round = stats.rounds, nodes = doomed.len(), edges = removed_edges, "peeled");
    }
    stats
}

/// Restrict to the largest connected component, then peel to `config.min_degree`.
pub fn peel(graph: &BipartiteGraph, config: PeelConfig) -> PeelReport {
    let mut reduced = graph.largest_component();
    let lcc_removed_nodes = graph.node_count() - reduced.node_count();
    let lcc_removed_edges = graph.edge_count() - reduced.edge_count();
    let stats = PeelStats {
        lcc_removed_nodes,
        lcc_removed_edges,
        ..peel_in_place(&mut reduced, config.min_degree)
    };
    let (users, venues) = reduced.partition_counts();
    let connected = reduced.is_connected();

    info!(
        min_degree = config.min_degree,
        nodes = reduced.node_count(),
        edges = reduced.edge_count(),
        users,
        venues,
        rounds = stats.rounds,
        removed_edges = stats.total_removed_edges(),
        connected,
        "peeled graph"
    );
    if !connected {
        warn!(
            components = reduced.connected_components().len(),
            "peeled graph split into several components"
        );
    }
    PeelReport { graph: reduced, stats, users, venues, connected }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_collapses_completely() {
        // Center user 1 with four venue leaves.
        let g = BipartiteGraph::from_edges(100, [(1, 101), (1, 102), (1, 103), (1, 104)]).unwrap();
        let report = peel(&g, PeelConfig { min_degree: 2 });
        assert!(report.graph.is_empty());
        assert_eq!(report.graph.edge_count(), 0);
        assert_eq!(report.stats.rounds, 2);
        assert_eq!(report.stats.removed_nodes, 5);
        assert_eq!((report.users, report.venues), (0, 0));
        assert!(report.edges().is_empty());
    }

    #[test]
    fn keeps_two_core_and_drops_small_components() {
        // 4-cycle 1-101-2-102-1 with a pendant venue 103 on user 1,
        // plus a separate 4-cycle 5-105-6-106.
        let g = BipartiteGraph::from_edges(
            100,
            [(1, 101), (2, 101), (2, 102), (1, 102), (1, 103), (5, 105), (6, 105), (6, 106), (5, 106)],
        )
        .unwrap();
        let report = peel(&g, PeelConfig { min_degree: 2 });
        assert_eq!(report.graph.node_count(), 4);
        assert_eq!(report.graph.edge_count(), 4);
        assert_eq!((report.users, report.venues), (2, 2));
        assert!(report.connected);
        assert!(!report.graph.contains_node(103));
        // Only the larger component survives the LCC cut.
        assert!(report.graph.contains_node(1));
        assert!(!report.graph.contains_node(5));
    }

    /// Users 1..=3 × venues 101..=103 and users 4..=6 × venues 104..=106, bridged by venue 107
    /// visiting users 3 and 4.
    fn bridged_blocks() -> BipartiteGraph {
        let mut edges = Vec::new();
        for (users, venues) in [(1..=3u64, 101..=103u64), (4..=6, 104..=106)] {
            for u in users {
                for v in venues.clone() {
                    edges.push((u, v));
                }
            }
        }
        edges.extend([(3, 107), (4, 107)]);
        BipartiteGraph::from_edges(100, edges).unwrap()
    }

    #[test]
    fn peeling_can_split_the_largest_component() {
        let report = peel(&bridged_blocks(), PeelConfig { min_degree: 3 });
        assert!(!report.connected);
        assert_eq!(report.graph.connected_components().len(), 2);
        assert_eq!(report.graph.node_count(), 12);
        assert!(!report.graph.contains_node(107));
        assert_eq!(
            report.stats,
            PeelStats { rounds: 1, removed_nodes: 1, removed_edges: 2, lcc_removed_nodes: 0, lcc_removed_edges: 0 }
        );
    }

    #[test]
    fn largest_component_cut_is_counted() {
        let mut g = bridged_blocks();
        g.add_edge(50, 150).unwrap();
        let input_edges = g.edge_count();
        let report = peel(&g, PeelConfig { min_degree: 1 });
        assert!(report.connected);
        assert_eq!(report.stats.rounds, 0);
        assert_eq!((report.stats.lcc_removed_nodes, report.stats.lcc_removed_edges), (2, 1));
        assert_eq!(report.graph.edge_count() + report.stats.total_removed_edges(), input_edges);
        assert_eq!(report.graph.node_count() + report.stats.total_removed_nodes(), g.node_count());
    }

    #[test]
    fn peeling_is_idempotent() {
        let mut g = BipartiteGraph::from_edges(
            100,
            [(1, 101), (2, 101), (2, 102), (1, 102), (3, 102), (3, 103)],
        )
        .unwrap();
        peel_in_place(&mut g, 2);
        let edges: Vec<Edge> = g.edges().collect();
        let again = peel_in_place(&mut g, 2);
        assert_eq!(again, PeelStats::default());
        assert_eq!(g.edges().collect::<Vec<_>>(), edges);
    }

    #[test]
    fn threshold_one_only_drops_isolated() {
        let mut g = BipartiteGraph::from_edges(100, [(1, 101)]).unwrap();
        g.add_node(7);
        let stats = peel_in_place(&mut g, 1);
        assert_eq!(stats.removed_nodes, 1);
        assert_eq!(g.node_count(), 2);
    }
}
