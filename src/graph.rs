//! Bipartite user–venue graph store and the neighbor adapter trait.
//!
//! Node ids live in one integer space. Ids `<= max_user_id` are users, larger ids are venues
//! (the ingestion side offsets venue ids by `max_user_id`). Every edge joins a user to a venue;
//! this is checked on insertion and never relaxed.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Error, Result};

pub type NodeId = u64;

static NEXT_SNAPSHOT: AtomicU64 = AtomicU64::new(1);

fn next_snapshot() -> u64 {
    NEXT_SNAPSHOT.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Partition {
    User,
    Venue,
}

impl Partition {
    pub fn of(node: NodeId, max_user_id: NodeId) -> Self {
        if node <= max_user_id {
            Partition::User
        } else {
            Partition::Venue
        }
    }
}

/// An undirected user–venue edge, always stored user-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    pub user: NodeId,
    pub venue: NodeId,
}

impl Edge {
    /// Orient `(a, b)` as `(user, venue)`.
    ///
    /// Fails with [`Error::NotBipartite`] when both ends fall in the same partition
    /// (self-loops included).
    pub fn new(a: NodeId, b: NodeId, max_user_id: NodeId) -> Result<Self> {
        match (Partition::of(a, max_user_id), Partition::of(b, max_user_id)) {
            (Partition::User, Partition::Venue) => Ok(Self { user: a, venue: b }),
            (Partition::Venue, Partition::User) => Ok(Self { user: b, venue: a }),
            _ => Err(Error::NotBipartite { a, b }),
        }
    }
}

/// A read-only neighborhood view that returns **borrowed**, sorted neighbor slices.
///
/// Scorers and the distance estimator are written against this trait so that repeated
/// lookups never allocate.
pub trait NeighborRef {
    fn node_count(&self) -> usize;

    fn contains(&self, node: NodeId) -> bool;

    /// Sorted neighbors of `node`, or [`Error::UnknownNode`].
    fn neighbors_ref(&self, node: NodeId) -> Result<&[NodeId]>;

    fn degree(&self, node: NodeId) -> Result<usize> {
        Ok(self.neighbors_ref(node)?.len())
    }
}

/// Mutable simple undirected bipartite graph (no parallel edges, no weights).
///
/// Every mutation assigns a fresh snapshot id; derived artifacts such as
/// [`NeighborCache`](crate::NeighborCache) record the id they were built from.
#[derive(Debug, Clone)]
pub struct BipartiteGraph {
    max_user_id: NodeId,
    adj: BTreeMap<NodeId, BTreeSet<NodeId>>,
    edge_count: usize,
    snapshot: u64,
}

impl BipartiteGraph {
    pub fn new(max_user_id: NodeId) -> Self {
        Self { max_user_id, adj: BTreeMap::new(), edge_count: 0, snapshot: next_snapshot() }
    }

    /// Build from `(src, dst)` pairs. Repeated pairs collapse into one edge.
    pub fn from_edges<I>(max_user_id: NodeId, edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let mut graph = Self::new(max_user_id);
        for (a, b) in edges {
            graph.add_edge(a, b)?;
        }
        Ok(graph)
    }

    pub fn max_user_id(&self) -> NodeId {
        self.max_user_id
    }

    pub fn snapshot(&self) -> u64 {
        self.snapshot
    }

    pub fn partition(&self, node: NodeId) -> Partition {
        Partition::of(node, self.max_user_id)
    }

    pub fn node_count(&self) -> usize {
        self.adj.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.adj.is_empty()
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.adj.contains_key(&node)
    }

    /// Returns `true` if the node was not present before.
    pub fn add_node(&mut self, node: NodeId) -> bool {
        if self.adj.contains_key(&node) {
            return false;
        }
        self.adj.insert(node, BTreeSet::new());
        self.snapshot = next_snapshot();
        true
    }

    /// Delete `node` and every incident edge. Returns the number of edges removed.
    pub fn remove_node(&mut self, node: NodeId) -> Result<usize> {
        let nbrs = self
            .adj
            .remove(&node)
            .ok_or(Error::UnknownNode { node, snapshot: self.snapshot })?;
        for nb in &nbrs {
            if let Some(set) = self.adj.get_mut(nb) {
                set.remove(&node);
            }
        }
        self.edge_count -= nbrs.len();
        self.snapshot = next_snapshot();
        Ok(nbrs.len())
    }

    /// Delete a batch of nodes; ids that are already gone are skipped.
    /// Returns the number of edges removed.
    pub fn remove_nodes(&mut self, nodes: &[NodeId]) -> usize {
        let mut removed = 0;
        for &node in nodes {
            if let Ok(n) = self.remove_node(node) {
                removed += n;
            }
        }
        removed
    }

    /// Insert the edge `{a, b}`, creating missing endpoints.
    ///
    /// Returns `Ok(false)` when the edge already existed (multiplicity is not modeled).
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Result<bool> {
        Edge::new(a, b, self.max_user_id)?;
        if self.has_edge(a, b) {
            return Ok(false);
        }
        self.adj.entry(a).or_default().insert(b);
        self.adj.entry(b).or_default().insert(a);
        self.edge_count += 1;
        self.snapshot = next_snapshot();
        Ok(true)
    }

    /// Delete the edge `{a, b}`. Deleting a missing edge is a no-op returning `false`.
    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        let removed = match self.adj.get_mut(&a) {
            Some(set) => set.remove(&b),
            None => false,
        };
        if !removed {
            return false;
        }
        if let Some(set) = self.adj.get_mut(&b) {
            set.remove(&a);
        }
        self.edge_count -= 1;
        self.snapshot = next_snapshot();
        true
    }

    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.adj.get(&a).is_some_and(|set| set.contains(&b))
    }

    pub fn neighbors(&self, node: NodeId) -> Result<&BTreeSet<NodeId>> {
        self.adj.get(&node).ok_or(Error::UnknownNode { node, snapshot: self.snapshot })
    }

    pub fn degree(&self, node: NodeId) -> Result<usize> {
        Ok(self.neighbors(node)?.len())
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adj.keys().copied()
    }

    pub fn users(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes().filter(|&n| self.partition(n) == Partition::User)
    }

    pub fn venues(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes().filter(|&n| self.partition(n) == Partition::Venue)
    }

    /// `(users, venues)` node counts.
    pub fn partition_counts(&self) -> (usize, usize) {
        let users = self.users().count();
        (users, self.node_count() - users)
    }

    /// Each edge exactly once, user-first, ordered by `(user, venue)`.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.adj
            .iter()
            .filter(|(&u, _)| self.partition(u) == Partition::User)
            .flat_map(|(&u, nbrs)| nbrs.iter().map(move |&v| Edge { user: u, venue: v }))
    }

    /// True when the graph has at most one connected component (an empty graph counts).
    pub fn is_connected(&self) -> bool {
        match self.adj.keys().next() {
            None => true,
            Some(&start) => {
                let mut seen = HashSet::with_capacity(self.adj.len());
                self.bfs(start, &mut seen).len() == self.adj.len()
            }
        }
    }

    /// Connected components, each sorted ascending, ordered by their smallest node id.
    pub fn connected_components(&self) -> Vec<Vec<NodeId>> {
        let mut seen = HashSet::with_capacity(self.adj.len());
        let mut components = Vec::new();
        for &start in self.adj.keys() {
            if seen.contains(&start) {
                continue;
            }
            let mut comp = self.bfs(start, &mut seen);
            comp.sort_unstable();
            components.push(comp);
        }
        components
    }

    /// The induced subgraph on the largest connected component.
    ///
    /// Among equally large components the one holding the smallest node id wins.
    pub fn largest_component(&self) -> BipartiteGraph {
        let mut best: Vec<NodeId> = Vec::new();
        for comp in self.connected_components() {
            if comp.len() > best.len() {
                best = comp;
            }
        }
        let keep: HashSet<NodeId> = best.into_iter().collect();
        self.induced(&keep)
    }

    fn induced(&self, keep: &HashSet<NodeId>) -> BipartiteGraph {
        let mut adj = BTreeMap::new();
        let mut degree_sum = 0usize;
        for (&node, nbrs) in &self.adj {
            if !keep.contains(&node) {
                continue;
            }
            let kept: BTreeSet<NodeId> = nbrs.iter().copied().filter(|n| keep.contains(n)).collect();
            degree_sum += kept.len();
            adj.insert(node, kept);
        }
        BipartiteGraph {
            max_user_id: self.max_user_id,
            adj,
            edge_count: degree_sum / 2,
            snapshot: next_snapshot(),
        }
    }

    fn bfs(&self, start: NodeId, seen: &mut HashSet<NodeId>) -> Vec<NodeId> {
        let mut q = vec![start];
        seen.insert(start);
        let mut head = 0usize;
        while head < q.len() {
            let cur = q[head];
            head += 1;
            if let Some(nbrs) = self.adj.get(&cur) {
                for &nx in nbrs {
                    if seen.insert(nx) {
                        q.push(nx);
                    }
                }
            }
        }
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // users {1,2,3}, venues {101,102}
    fn scenario() -> BipartiteGraph {
        BipartiteGraph::from_edges(100, [(1, 101), (2, 101), (2, 102), (3, 102)]).unwrap()
    }

    #[test]
    fn degrees_and_counts() {
        let g = scenario();
        assert_eq!(g.node_count(), 5);
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.degree(2).unwrap(), 2);
        assert_eq!(g.degree(101).unwrap(), 2);
        assert_eq!(g.partition_counts(), (3, 2));
        assert!(g.has_edge(101, 1));
        assert!(!g.has_edge(1, 102));
    }

    #[test]
    fn rejects_same_partition_edges() {
        let mut g = BipartiteGraph::new(100);
        assert!(matches!(g.add_edge(1, 2), Err(Error::NotBipartite { a: 1, b: 2 })));
        assert!(matches!(g.add_edge(101, 102), Err(Error::NotBipartite { .. })));
        assert!(matches!(g.add_edge(5, 5), Err(Error::NotBipartite { .. })));
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn repeated_edges_collapse() {
        let g = BipartiteGraph::from_edges(100, [(1, 101), (101, 1), (1, 101)]).unwrap();
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn remove_node_cascades() {
        let mut g = scenario();
        assert_eq!(g.remove_node(2).unwrap(), 2);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.degree(101).unwrap(), 1);
        assert_eq!(g.degree(102).unwrap(), 1);
        assert!(matches!(g.neighbors(2), Err(Error::UnknownNode { node: 2, .. })));
    }

    #[test]
    fn remove_missing_edge_is_noop() {
        let mut g = scenario();
        let before = g.snapshot();
        assert!(!g.remove_edge(1, 102));
        assert!(!g.remove_edge(7, 8));
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.snapshot(), before);
    }

    #[test]
    fn mutation_changes_snapshot() {
        let mut g = scenario();
        let before = g.snapshot();
        assert!(g.remove_edge(1, 101));
        assert_ne!(g.snapshot(), before);
    }

    #[test]
    fn edges_are_user_first_and_unique() {
        let g = scenario();
        let edges: Vec<Edge> = g.edges().collect();
        assert_eq!(edges.len(), g.edge_count());
        assert!(edges.iter().all(|e| e.user <= 100 && e.venue > 100));
        assert_eq!(edges[0], Edge { user: 1, venue: 101 });
    }

    #[test]
    fn components_and_largest() {
        // Two components: {1,2,101,102,3} and {4,103}; plus isolated venue 104.
        let mut g = scenario();
        g.add_edge(4, 103).unwrap();
        g.add_node(104);
        assert!(!g.is_connected());

        let comps = g.connected_components();
        assert_eq!(comps.len(), 3);
        assert_eq!(comps[0], vec![1, 2, 3, 101, 102]);

        let lcc = g.largest_component();
        assert!(lcc.is_connected());
        assert_eq!(lcc.node_count(), 5);
        assert_eq!(lcc.edge_count(), 4);
        assert!(!lcc.contains_node(4));
    }

    #[test]
    fn empty_graph_is_connected() {
        let g = BipartiteGraph::new(10);
        assert!(g.is_connected());
        assert!(g.connected_components().is_empty());
        assert!(g.largest_component().is_empty());
    }
}
