//! Neighborhood similarity heuristics for bipartite link prediction.
//!
//! In a bipartite graph a user and a venue never share a neighbor, so the classic
//! common-neighbor family is lifted to two hops:
//!
//! - **user-oriented**: compare `N(user)` with `N(u_i)` for every user `u_i` who visited the
//!   venue, keep the best overlap;
//! - **venue-oriented**: compare `N(venue)` with `N(v_i)` for every venue `v_i` the user
//!   visited, keep the best overlap.
//!
//! The two orientations are different scoring functions. Pairs that are already edges are
//! scored like any other pair (in that case `u_i == user` is one of the candidates).
//!
//! All functions are pure reads over a [`NeighborRef`], require `x != y`, and fail with
//! [`Error::UnknownNode`] for ids missing from the snapshot.

use std::collections::HashMap;
use std::fmt;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::cache::NeighborCache;
use crate::distance::{DistanceConfig, DistanceEstimator};
use crate::graph::{NeighborRef, NodeId};
use crate::{Error, Result};

/// Katz parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KatzConfig {
    /// Per-hop damping. Large values overflow quickly on high-branching graphs.
    pub beta: f64,
    /// Longest walk length counted.
    pub max_length: usize,
}

impl Default for KatzConfig {
    fn default() -> Self {
        Self { beta: 0.005, max_length: 3 }
    }
}

fn pair<G: NeighborRef>(graph: &G, x: NodeId, y: NodeId) -> Result<(&[NodeId], &[NodeId])> {
    if x == y {
        return Err(Error::InvalidPair(x));
    }
    Ok((graph.neighbors_ref(x)?, graph.neighbors_ref(y)?))
}

/// Merge-walk two sorted slices, calling `f` on every shared element.
fn for_each_common(a: &[NodeId], b: &[NodeId], mut f: impl FnMut(NodeId)) {
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                f(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
}

fn intersection_len(a: &[NodeId], b: &[NodeId]) -> usize {
    let mut n = 0usize;
    for_each_common(a, b, |_| n += 1);
    n
}

/// `max_{i ∈ N(via)} |N(anchor) ∩ N(i)|`.
fn best_overlap<G: NeighborRef>(graph: &G, anchor: NodeId, via: NodeId) -> Result<usize> {
    let (n_anchor, n_via) = pair(graph, anchor, via)?;
    let mut best = 0usize;
    for &i in n_via {
        best = best.max(intersection_len(n_anchor, graph.neighbors_ref(i)?));
    }
    Ok(best)
}

/// Adamic–Adar weight of a shared neighbor. Degree ≤ 1 contributes 0 instead of `1/ln(1)`.
fn adamic_adar_weight(degree: usize) -> f64 {
    if degree <= 1 {
        0.0
    } else {
        1.0 / (degree as f64).ln()
    }
}

fn best_weighted_overlap<G: NeighborRef>(graph: &G, anchor: NodeId, via: NodeId) -> Result<f64> {
    let (n_anchor, n_via) = pair(graph, anchor, via)?;
    let mut best = 0.0f64;
    for &i in n_via {
        let mut sum = 0.0f64;
        let mut failed = None;
        for_each_common(n_anchor, graph.neighbors_ref(i)?, |z| match graph.degree(z) {
            Ok(d) => sum += adamic_adar_weight(d),
            Err(e) => failed = Some(e),
        });
        if let Some(e) = failed {
            return Err(e);
        }
        best = best.max(sum);
    }
    Ok(best)
}

/// `max_{u_i ∈ N(venue)} |N(user) ∩ N(u_i)|`.
pub fn common_neighbors_user<G: NeighborRef>(graph: &G, user: NodeId, venue: NodeId) -> Result<usize> {
    best_overlap(graph, user, venue)
}

/// `max_{v_i ∈ N(user)} |N(venue) ∩ N(v_i)|`.
pub fn common_neighbors_venue<G: NeighborRef>(graph: &G, user: NodeId, venue: NodeId) -> Result<usize> {
    best_overlap(graph, venue, user)
}

/// `|N(x) ∩ N(y)| / |N(x) ∪ N(y)|`, in `[0, 1]`.
///
/// Two isolated nodes have an empty union: [`Error::DivideByZero`].
pub fn jaccard_coefficient<G: NeighborRef>(graph: &G, x: NodeId, y: NodeId) -> Result<f64> {
    let (nx, ny) = pair(graph, x, y)?;
    let common = intersection_len(nx, ny);
    let union = nx.len() + ny.len() - common;
    if union == 0 {
        return Err(Error::DivideByZero { x, y });
    }
    Ok(common as f64 / union as f64)
}

/// Adamic–Adar over the user-oriented two-hop overlap:
/// `max_{u_i ∈ N(venue)} Σ_{z ∈ N(user) ∩ N(u_i)} 1 / ln(deg z)`.
pub fn adamic_adar_user<G: NeighborRef>(graph: &G, user: NodeId, venue: NodeId) -> Result<f64> {
    best_weighted_overlap(graph, user, venue)
}

/// Venue-oriented counterpart of [`adamic_adar_user`].
pub fn adamic_adar_venue<G: NeighborRef>(graph: &G, user: NodeId, venue: NodeId) -> Result<f64> {
    best_weighted_overlap(graph, venue, user)
}

/// `deg(x) * deg(y)`.
pub fn preferential_attachment<G: NeighborRef>(graph: &G, x: NodeId, y: NodeId) -> Result<usize> {
    let (nx, ny) = pair(graph, x, y)?;
    Ok(nx.len() * ny.len())
}

/// Damped walk counts: `Σ_{l=1..max_length} β^l · walks_l(x, y)`.
///
/// Walks may revisit nodes and are counted with multiplicity, by pushing a node → count
/// multiset one hop at a time from `x`. With `β = 0` every pair scores 0.
pub fn katz<G: NeighborRef>(graph: &G, x: NodeId, y: NodeId, config: KatzConfig) -> Result<f64> {
    pair(graph, x, y)?;
    let mut counts: HashMap<NodeId, f64> = HashMap::from([(x, 1.0)]);
    let mut next: HashMap<NodeId, f64> = HashMap::new();
    let mut damping = 1.0f64;
    let mut score = 0.0f64;
    for _ in 0..config.max_length {
        next.clear();
        for (&node, &c) in &counts {
            for &nb in graph.neighbors_ref(node)? {
                *next.entry(nb).or_insert(0.0) += c;
            }
        }
        damping *= config.beta;
        score += damping * next.get(&y).copied().unwrap_or(0.0);
        std::mem::swap(&mut counts, &mut next);
    }
    Ok(score)
}

fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    x
}

/// Baseline predictor: a uniform score in `[0, 1)` that depends only on `(seed, user, venue)`.
pub fn random_score(seed: u64, user: NodeId, venue: NodeId) -> f64 {
    let mut rng = ChaCha8Rng::seed_from_u64(mix64(seed ^ mix64(user ^ mix64(venue))));
    rng.random::<f64>()
}

/// The fixed set of scoring strategies, selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Heuristic {
    Distance(DistanceConfig),
    CommonNeighborsUser,
    CommonNeighborsVenue,
    Jaccard,
    AdamicAdarUser,
    AdamicAdarVenue,
    PreferentialAttachment,
    Katz(KatzConfig),
    Random { seed: u64 },
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Heuristic::Distance(_) => write!(f, "Distance"),
            Heuristic::CommonNeighborsUser => write!(f, "Common Neighbors (user)"),
            Heuristic::CommonNeighborsVenue => write!(f, "Common Neighbors (venue)"),
            Heuristic::Jaccard => write!(f, "Jaccard"),
            Heuristic::AdamicAdarUser => write!(f, "Adamic/Adar (user)"),
            Heuristic::AdamicAdarVenue => write!(f, "Adamic/Adar (venue)"),
            Heuristic::PreferentialAttachment => write!(f, "Preferential Attachment"),
            Heuristic::Katz(cfg) => write!(f, "Katz (beta={})", cfg.beta),
            Heuristic::Random { .. } => write!(f, "Random Predictor"),
        }
    }
}

/// A [`Heuristic`] bound to one cache snapshot. `Sync`, so workers can share it.
#[derive(Debug, Clone)]
pub struct Scorer<'a> {
    cache: &'a NeighborCache,
    heuristic: Heuristic,
    distance: Option<DistanceEstimator<'a>>,
}

impl<'a> Scorer<'a> {
    pub fn new(cache: &'a NeighborCache, heuristic: Heuristic) -> Result<Self> {
        let distance = match heuristic {
            Heuristic::Distance(cfg) => Some(DistanceEstimator::new(cache, cfg)?),
            _ => None,
        };
        Ok(Self { cache, heuristic, distance })
    }

    pub fn heuristic(&self) -> Heuristic {
        self.heuristic
    }

    pub fn cache(&self) -> &'a NeighborCache {
        self.cache
    }

    pub fn score(&self, user: NodeId, venue: NodeId) -> Result<f64> {
        let g = self.cache;
        match self.heuristic {
            Heuristic::Distance(_) => match &self.distance {
                Some(est) => est.estimate(user, venue).map(|d| d as f64),
                None => Err(Error::InvalidParameter("distance scorer without estimator".into())),
            },
            Heuristic::CommonNeighborsUser => common_neighbors_user(g, user, venue).map(|s| s as f64),
            Heuristic::CommonNeighborsVenue => common_neighbors_venue(g, user, venue).map(|s| s as f64),
            Heuristic::Jaccard => jaccard_coefficient(g, user, venue),
            Heuristic::AdamicAdarUser => adamic_adar_user(g, user, venue),
            Heuristic::AdamicAdarVenue => adamic_adar_venue(g, user, venue),
            Heuristic::PreferentialAttachment => {
                preferential_attachment(g, user, venue).map(|s| s as f64)
            }
            Heuristic::Katz(cfg) => katz(g, user, venue, cfg),
            Heuristic::Random { seed } => {
                pair(g, user, venue)?;
                Ok(random_score(seed, user, venue))
            }
        }
    }
}
