//! Candidate generation and batch scoring.
//!
//! Candidates are the user × venue cross product, generated users-ascending then
//! venues-ascending; each carries its generation index so rankings can break ties the same
//! way no matter how scoring was scheduled.

use tracing::{debug, info};

use crate::graph::{BipartiteGraph, NodeId};
use crate::similarity::Scorer;
use crate::topk::top_k;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Candidate {
    pub user: NodeId,
    pub venue: NodeId,
    /// Position in generation order.
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoredPair {
    pub user: NodeId,
    pub venue: NodeId,
    pub score: f64,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CandidateConfig {
    /// Score pairs that are already edges of the training graph.
    pub include_existing: bool,
    /// Only pair nodes from the largest connected component (required for distance scoring).
    pub largest_component_only: bool,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self { include_existing: true, largest_component_only: false }
    }
}

pub fn candidates(graph: &BipartiteGraph, config: CandidateConfig) -> Vec<Candidate> {
    let (users, venues): (Vec<NodeId>, Vec<NodeId>) = if config.largest_component_only {
        let lcc = graph.largest_component();
        (lcc.users().collect(), lcc.venues().collect())
    } else {
        (graph.users().collect(), graph.venues().collect())
    };

    let mut out = Vec::with_capacity(users.len() * venues.len());
    for &user in &users {
        for &venue in &venues {
            if !config.include_existing && graph.has_edge(user, venue) {
                continue;
            }
            out.push(Candidate { user, venue, index: out.len() });
        }
    }
    out
}

fn log_top(heuristic: &str, scored: &[ScoredPair]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    if let Ok(best) = top_k(scored, 10) {
        for (rank, s) in best.iter().enumerate() {
            debug!(heuristic, rank, user = s.user, venue = s.venue, score = s.score, "top pair");
        }
    }
}

/// Score every candidate on the calling thread.
pub fn score_all(scorer: &Scorer<'_>, candidates: &[Candidate]) -> Result<Vec<ScoredPair>> {
    let heuristic = scorer.heuristic().to_string();
    info!(heuristic = %heuristic, candidates = candidates.len(), "scoring candidates");
    let scored = candidates
        .iter()
        .map(|c| {
            scorer.score(c.user, c.venue).map(|score| ScoredPair {
                user: c.user,
                venue: c.venue,
                score,
                index: c.index,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    log_top(&heuristic, &scored);
    Ok(scored)
}

/// Score every candidate on the Rayon pool.
///
/// Invariant: output equals [`score_all`] for the same inputs, independent of thread count.
#[cfg(feature = "parallel")]
pub fn score_all_parallel(scorer: &Scorer<'_>, candidates: &[Candidate]) -> Result<Vec<ScoredPair>> {
    use rayon::prelude::*;

    let heuristic = scorer.heuristic().to_string();
    info!(
        heuristic = %heuristic,
        candidates = candidates.len(),
        threads = rayon::current_num_threads(),
        "scoring candidates in parallel"
    );
    let scored = candidates
        .par_iter()
        .map(|c| {
            scorer.score(c.user, c.venue).map(|score| ScoredPair {
                user: c.user,
                venue: c.venue,
                score,
                index: c.index,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    log_top(&heuristic, &scored);
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> BipartiteGraph {
        BipartiteGraph::from_edges(100, [(1, 101), (2, 101), (2, 102), (3, 102)]).unwrap()
    }

    #[test]
    fn cross_product_in_generation_order() {
        let g = scenario();
        let c = candidates(&g, CandidateConfig::default());
        assert_eq!(c.len(), 6);
        assert_eq!((c[0].user, c[0].venue, c[0].index), (1, 101, 0));
        assert_eq!((c[1].user, c[1].venue, c[1].index), (1, 102, 1));
        assert_eq!((c[5].user, c[5].venue, c[5].index), (3, 102, 5));
    }

    #[test]
    fn existing_edges_can_be_filtered() {
        let g = scenario();
        let cfg = CandidateConfig { include_existing: false, ..CandidateConfig::default() };
        let c = candidates(&g, cfg);
        let pairs: Vec<(NodeId, NodeId)> = c.iter().map(|c| (c.user, c.venue)).collect();
        assert_eq!(pairs, vec![(1, 102), (3, 101)]);
        assert_eq!(c[1].index, 1);
    }

    #[test]
    fn largest_component_restriction() {
        let mut g = scenario();
        g.add_edge(4, 103).unwrap();
        let all = candidates(&g, CandidateConfig::default());
        assert_eq!(all.len(), 4 * 3);
        let cfg = CandidateConfig { largest_component_only: true, ..CandidateConfig::default() };
        let lcc = candidates(&g, cfg);
        assert_eq!(lcc.len(), 3 * 2);
        assert!(lcc.iter().all(|c| c.user != 4 && c.venue != 103));
    }
}
