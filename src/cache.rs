//! Immutable neighbor snapshot for scoring.
//!
//! Built once from a [`BipartiteGraph`] after all mutation phases are done. Each node maps to
//! a sorted, boxed neighbor slice, so lookups are a single hash probe and intersections are
//! allocation-free merges. The cache is `Sync` and meant to be shared by reference across
//! scoring workers.

use std::collections::HashMap;

use crate::graph::{BipartiteGraph, NeighborRef, NodeId};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct NeighborCache {
    neighbors: HashMap<NodeId, Box<[NodeId]>>,
    max_user_id: NodeId,
    snapshot: u64,
}

impl NeighborCache {
    pub fn build(graph: &BipartiteGraph) -> Result<Self> {
        let mut neighbors = HashMap::with_capacity(graph.node_count());
        for node in graph.nodes() {
            // BTreeSet iteration is ascending, so the slice is already sorted.
            let nbrs: Box<[NodeId]> = graph.neighbors(node)?.iter().copied().collect();
            neighbors.insert(node, nbrs);
        }
        if neighbors.len() != graph.node_count() {
            return Err(Error::CacheBuild {
                entries: neighbors.len(),
                nodes: graph.node_count(),
                snapshot: graph.snapshot(),
            });
        }
        Ok(Self { neighbors, max_user_id: graph.max_user_id(), snapshot: graph.snapshot() })
    }

    pub fn snapshot(&self) -> u64 {
        self.snapshot
    }

    pub fn max_user_id(&self) -> NodeId {
        self.max_user_id
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Cached node ids, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.neighbors.keys().copied()
    }

    pub fn neighbors(&self, node: NodeId) -> Result<&[NodeId]> {
        self.neighbors
            .get(&node)
            .map(|b| &**b)
            .ok_or(Error::UnknownNode { node, snapshot: self.snapshot })
    }

    /// Fails with [`Error::StaleCache`] if `graph` has mutated since this cache was built.
    pub fn ensure_current(&self, graph: &BipartiteGraph) -> Result<()> {
        if graph.snapshot() != self.snapshot {
            return Err(Error::StaleCache { cache: self.snapshot, graph: graph.snapshot() });
        }
        Ok(())
    }
}

impl NeighborRef for NeighborCache {
    fn node_count(&self) -> usize {
        self.neighbors.len()
    }

    fn contains(&self, node: NodeId) -> bool {
        self.neighbors.contains_key(&node)
    }

    fn neighbors_ref(&self, node: NodeId) -> Result<&[NodeId]> {
        self.neighbors(node)
    }
}
