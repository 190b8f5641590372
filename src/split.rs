//! Train/test construction by withholding edges.

use std::collections::{HashMap, HashSet};

use rand::prelude::*;
use tracing::{info, warn};

use crate::graph::{BipartiteGraph, Edge, NodeId};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SplitConfig {
    /// Fraction of edges to withhold, in `[0, 1]`.
    pub fraction: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self { fraction: 0.2, seed: 42 }
    }
}

/// Withheld edges. Membership ignores orientation.
#[derive(Debug, Clone, Default)]
pub struct HeldOutEdges {
    edges: Vec<Edge>,
    lookup: HashSet<(NodeId, NodeId)>,
}

fn unordered(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl HeldOutEdges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the edge was already held out.
    pub fn insert(&mut self, edge: Edge) -> bool {
        if !self.lookup.insert(unordered(edge.user, edge.venue)) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub fn contains(&self, a: NodeId, b: NodeId) -> bool {
        self.lookup.contains(&unordered(a, b))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edges in the order they were withheld.
    pub fn iter(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter()
    }
}

impl FromIterator<Edge> for HeldOutEdges {
    fn from_iter<I: IntoIterator<Item = Edge>>(iter: I) -> Self {
        let mut out = Self::new();
        for e in iter {
            out.insert(e);
        }
        out
    }
}

/// Nodes currently eligible as a removal origin, with O(1) uniform draw and removal.
struct Eligible {
    items: Vec<NodeId>,
    pos: HashMap<NodeId, usize>,
}

impl Eligible {
    fn new(items: Vec<NodeId>) -> Self {
        let pos = items.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        Self { items, pos }
    }

    fn remove(&mut self, node: NodeId) {
        if let Some(i) = self.pos.remove(&node) {
            self.items.swap_remove(i);
            if let Some(&moved) = self.items.get(i) {
                self.pos.insert(moved, i);
            }
        }
    }
}

fn check_fraction(fraction: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(Error::InvalidParameter(format!("split fraction {fraction} outside [0, 1]")));
    }
    Ok(())
}

/// Withhold `floor(edge_count * fraction)` edges from `graph`, which becomes the training graph.
///
/// Each draw picks a uniformly random node of current degree ≥ 2, then a uniformly random
/// neighbor, and deletes that edge. The degree filter is checked per draw only: the other
/// endpoint may still end up isolated, so "no node is isolated by splitting" is a tendency,
/// not a guarantee. If no node of degree ≥ 2 is left the split stops short of the target.
///
/// Postcondition: `edges_before - edges_after == held_out.len()`.
pub fn split_edges<R: Rng + ?Sized>(
    graph: &mut BipartiteGraph,
    fraction: f64,
    rng: &mut R,
) -> Result<HeldOutEdges> {
    check_fraction(fraction)?;
    let before = graph.edge_count();
    let target = (before as f64 * fraction).floor() as usize;

    let origins: Vec<NodeId> = graph.nodes().filter(|&n| graph.degree(n).is_ok_and(|d| d >= 2)).collect();
    let mut eligible = Eligible::new(origins);
    let mut held_out = HeldOutEdges::new();

    while held_out.len() < target {
        if eligible.items.is_empty() {
            warn!(target, removed = held_out.len(), "no node of degree >= 2 left; split stops early");
            break;
        }
        let node = eligible.items[rng.random_range(0..eligible.items.len())];
        let nbrs = graph.neighbors(node)?;
        if nbrs.is_empty() {
            eligible.remove(node);
            continue;
        }
        let Some(&nb) = nbrs.iter().nth(rng.random_range(0..nbrs.len())) else {
            eligible.remove(node);
            continue;
        };
        graph.remove_edge(node, nb);
        held_out.insert(Edge::new(node, nb, graph.max_user_id())?);
        for n in [node, nb] {
            if graph.degree(n)? < 2 {
                eligible.remove(n);
            }
        }
    }

    info!(
        edges_before = before,
        target,
        removed = held_out.len(),
        edges_after = graph.edge_count(),
        "withheld edges"
    );
    Ok(held_out)
}

/// Sequential split: the first `floor(len * fraction)` items train, the rest test.
pub fn split_prefix<T: Clone>(items: &[T], fraction: f64) -> Result<(Vec<T>, Vec<T>)> {
    check_fraction(fraction)?;
    let cutoff = (items.len() as f64 * fraction).floor() as usize;
    Ok((items[..cutoff].to_vec(), items[cutoff..].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn grid(users: u64, venues: u64) -> BipartiteGraph {
        let mut edges = Vec::new();
        for u in 1..=users {
            for v in 1..=venues {
                edges.push((u, 1000 + v));
            }
        }
        BipartiteGraph::from_edges(1000, edges).unwrap()
    }

    #[test]
    fn removes_exact_target() {
        let mut g = grid(5, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let held = split_edges(&mut g, 0.25, &mut rng).unwrap();
        assert_eq!(held.len(), 5);
        assert_eq!(g.edge_count(), 15);
        for e in held.iter() {
            assert!(!g.has_edge(e.user, e.venue));
            assert!(held.contains(e.venue, e.user));
        }
    }

    #[test]
    fn reproducible_given_seed() {
        let run = |seed| {
            let mut g = grid(6, 6);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            split_edges(&mut g, 0.3, &mut rng).unwrap().iter().copied().collect::<Vec<_>>()
        };
        assert_eq!(run(3), run(3));
    }

    #[test]
    fn stops_when_no_origin_left() {
        // A perfect matching: every node has degree 1.
        let mut g = BipartiteGraph::from_edges(100, [(1, 101), (2, 102), (3, 103)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let held = split_edges(&mut g, 1.0, &mut rng).unwrap();
        assert!(held.is_empty());
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn fraction_is_validated() {
        let mut g = grid(2, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(split_edges(&mut g, 1.5, &mut rng), Err(Error::InvalidParameter(_))));
        assert!(split_prefix(&[1, 2, 3], -0.1).is_err());
    }

    #[test]
    fn prefix_split() {
        let (train, test) = split_prefix(&[1, 2, 3, 4, 5], 0.5).unwrap();
        assert_eq!(train, vec![1, 2]);
        assert_eq!(test, vec![3, 4, 5]);
    }
}
