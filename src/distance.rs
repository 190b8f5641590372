//! Hop distance by bidirectional frontier expansion ("ring search").
//!
//! Two balls grow around `x` and `y`; each step expands whichever ball currently holds fewer
//! nodes by one full BFS level. The first step at which the balls touch gives the exact
//! shortest-path length: expanding by whole levels is level-synchronous BFS from both ends,
//! and picking the smaller side only changes how much work is done.
//!
//! The score is `-hops`, so "higher = more similar" holds like every other heuristic.
//!
//! Callers are expected to only ask about pairs in one component (usually the largest).
//! Violations are reported, never looped on:
//! - with `check_connectivity`, a precomputed [`ComponentIndex`] rejects the pair up front
//!   ([`Error::DisconnectedPair`]);
//! - otherwise the search stops once a side can no longer grow, or after `max_steps`
//!   expansions ([`Error::DistanceUnreachable`]).

use std::collections::{HashMap, HashSet};

use crate::cache::NeighborCache;
use crate::graph::{NeighborRef, NodeId};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistanceConfig {
    /// Expansion cap. `None` means the node count, which no shortest path can exceed.
    pub max_steps: Option<usize>,
    /// Reject cross-component pairs before searching.
    pub check_connectivity: bool,
}

/// Connected-component label per cached node.
#[derive(Debug, Clone)]
pub struct ComponentIndex {
    labels: HashMap<NodeId, usize>,
    count: usize,
}

impl ComponentIndex {
    pub fn build(cache: &NeighborCache) -> Result<Self> {
        let mut labels: HashMap<NodeId, usize> = HashMap::with_capacity(cache.len());
        let mut starts: Vec<NodeId> = cache.nodes().collect();
        starts.sort_unstable();

        let mut count = 0usize;
        let mut q: Vec<NodeId> = Vec::new();
        for start in starts {
            if labels.contains_key(&start) {
                continue;
            }
            q.clear();
            q.push(start);
            labels.insert(start, count);
            let mut head = 0usize;
            while head < q.len() {
                let cur = q[head];
                head += 1;
                for &nx in cache.neighbors(cur)? {
                    if !labels.contains_key(&nx) {
                        labels.insert(nx, count);
                        q.push(nx);
                    }
                }
            }
            count += 1;
        }
        Ok(Self { labels, count })
    }

    pub fn component_count(&self) -> usize {
        self.count
    }

    pub fn label(&self, node: NodeId) -> Option<usize> {
        self.labels.get(&node).copied()
    }

    pub fn same_component(&self, x: NodeId, y: NodeId) -> bool {
        match (self.label(x), self.label(y)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Number of ring-search expansions separating `x` and `y` (their hop distance).
pub fn ring_search<G: NeighborRef>(graph: &G, x: NodeId, y: NodeId, max_steps: usize) -> Result<usize> {
    if x == y {
        return Err(Error::InvalidPair(x));
    }
    // Both ends must exist before any expansion.
    graph.neighbors_ref(x)?;
    graph.neighbors_ref(y)?;

    let mut seen_s: HashSet<NodeId> = HashSet::from([x]);
    let mut seen_d: HashSet<NodeId> = HashSet::from([y]);
    let mut frontier_s: Vec<NodeId> = vec![x];
    let mut frontier_d: Vec<NodeId> = vec![y];
    let mut next: Vec<NodeId> = Vec::new();
    let mut steps = 0usize;

    loop {
        if steps >= max_steps {
            return Err(Error::DistanceUnreachable { x, y, steps });
        }
        let (seen, frontier, other) = if seen_s.len() < seen_d.len() {
            (&mut seen_s, &mut frontier_s, &seen_d)
        } else {
            (&mut seen_d, &mut frontier_d, &seen_s)
        };

        next.clear();
        let mut met = false;
        for &node in frontier.iter() {
            for &nb in graph.neighbors_ref(node)? {
                if seen.insert(nb) {
                    met |= other.contains(&nb);
                    next.push(nb);
                }
            }
        }
        steps += 1;
        if met {
            return Ok(steps);
        }
        if next.is_empty() {
            // This side has swallowed its whole component without touching the other.
            return Err(Error::DistanceUnreachable { x, y, steps });
        }
        std::mem::swap(frontier, &mut next);
    }
}

#[derive(Debug, Clone)]
pub struct DistanceEstimator<'a> {
    cache: &'a NeighborCache,
    config: DistanceConfig,
    components: Option<ComponentIndex>,
}

impl<'a> DistanceEstimator<'a> {
    pub fn new(cache: &'a NeighborCache, config: DistanceConfig) -> Result<Self> {
        let components = if config.check_connectivity {
            Some(ComponentIndex::build(cache)?)
        } else {
            None
        };
        Ok(Self { cache, config, components })
    }

    pub fn config(&self) -> DistanceConfig {
        self.config
    }

    /// `-hops(x, y)`.
    pub fn estimate(&self, x: NodeId, y: NodeId) -> Result<i64> {
        if x == y {
            return Err(Error::InvalidPair(x));
        }
        if let Some(index) = &self.components {
            self.cache.neighbors(x)?;
            self.cache.neighbors(y)?;
            if !index.same_component(x, y) {
                return Err(Error::DisconnectedPair { x, y });
            }
        }
        let cap = self.config.max_steps.unwrap_or(self.cache.len());
        let steps = ring_search(self.cache, x, y, cap)?;
        Ok(-(steps as i64))
    }
}
