//! End-to-end link-prediction run over one parameter set.
//!
//! build graph → peel (optional) → withhold edges → cache → candidates → score → rank →
//! evaluate. Graph mutation is strictly sequential and finishes before the cache is built;
//! scoring then only reads the cache.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::cache::NeighborCache;
use crate::eval::{evaluate, EvalConfig, EvalReport};
use crate::graph::{BipartiteGraph, NodeId};
use crate::predict::{candidates, score_all, Candidate, CandidateConfig, ScoredPair};
use crate::sample::{peel, PeelConfig, PeelStats};
use crate::similarity::{Heuristic, Scorer};
use crate::split::{split_edges, HeldOutEdges, SplitConfig};
use crate::stats::GraphSummary;
use crate::topk::rank;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperimentConfig {
    /// Partition boundary: ids `<= max_user_id` are users.
    pub max_user_id: NodeId,
    /// `None` skips the k-core reduction.
    pub peel: Option<PeelConfig>,
    pub split: SplitConfig,
    /// With [`Heuristic::Distance`] candidates are always restricted to the largest component of
    /// the train graph, since hop distance is undefined across components.
    pub candidates: CandidateConfig,
    pub heuristic: Heuristic,
    pub eval: EvalConfig,
    /// Use the Rayon pool when the `parallel` feature is enabled.
    pub parallel: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            max_user_id: 2_153_502,
            peel: Some(PeelConfig::default()),
            split: SplitConfig::default(),
            candidates: CandidateConfig::default(),
            heuristic: Heuristic::CommonNeighborsVenue,
            eval: EvalConfig::default(),
            parallel: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExperimentReport {
    pub input: GraphSummary,
    pub peel: Option<PeelStats>,
    pub train: GraphSummary,
    pub held_out: HeldOutEdges,
    pub ranked: Vec<ScoredPair>,
    pub metrics: EvalReport,
}

#[cfg(feature = "parallel")]
fn score_candidates(scorer: &Scorer<'_>, cands: &[Candidate], parallel: bool) -> Result<Vec<ScoredPair>> {
    if parallel {
        crate::predict::score_all_parallel(scorer, cands)
    } else {
        score_all(scorer, cands)
    }
}

#[cfg(not(feature = "parallel"))]
fn score_candidates(scorer: &Scorer<'_>, cands: &[Candidate], _parallel: bool) -> Result<Vec<ScoredPair>> {
    score_all(scorer, cands)
}

/// A train graph, its held-out edges and a cache of it, ready for any number of heuristics.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub input: GraphSummary,
    pub peel: Option<PeelStats>,
    pub train: BipartiteGraph,
    pub held_out: HeldOutEdges,
    pub cache: NeighborCache,
}

/// Run the mutation phases: build, optionally peel, withhold edges, then freeze into a cache.
pub fn prepare<I>(edges: I, config: &ExperimentConfig) -> Result<Prepared>
where
    I: IntoIterator<Item = (NodeId, NodeId)>,
{
    let graph = BipartiteGraph::from_edges(config.max_user_id, edges)?;
    let input = GraphSummary::of(&graph);
    info!(nodes = input.nodes, edges = input.edges, users = input.users, venues = input.venues, "loaded graph");

    let (mut train, peel_stats) = match config.peel {
        Some(pc) => {
            let report = peel(&graph, pc);
            (report.graph, Some(report.stats))
        }
        None => (graph, None),
    };

    let mut rng = ChaCha8Rng::seed_from_u64(config.split.seed);
    let held_out = split_edges(&mut train, config.split.fraction, &mut rng)?;
    let cache = NeighborCache::build(&train)?;
    Ok(Prepared { input, peel: peel_stats, train, held_out, cache })
}

fn candidate_config(heuristic: Heuristic, config: CandidateConfig) -> CandidateConfig {
    match heuristic {
        Heuristic::Distance(_) => CandidateConfig { largest_component_only: true, ..config },
        _ => config,
    }
}

/// Score, rank and evaluate one heuristic on a prepared split.
pub fn score_and_evaluate(
    prepared: &Prepared,
    heuristic: Heuristic,
    config: &ExperimentConfig,
) -> Result<(Vec<ScoredPair>, EvalReport)> {
    prepared.cache.ensure_current(&prepared.train)?;
    let cands = candidates(&prepared.train, candidate_config(heuristic, config.candidates));
    let scorer = Scorer::new(&prepared.cache, heuristic)?;
    let scored = score_candidates(&scorer, &cands, config.parallel)?;
    let metrics = evaluate(&scored, &prepared.held_out, config.eval)?;
    let ranked = rank(scored)?;
    Ok((ranked, metrics))
}

pub fn run<I>(edges: I, config: &ExperimentConfig) -> Result<ExperimentReport>
where
    I: IntoIterator<Item = (NodeId, NodeId)>,
{
    let prepared = prepare(edges, config)?;
    let (ranked, metrics) = score_and_evaluate(&prepared, config.heuristic, config)?;
    Ok(ExperimentReport {
        input: prepared.input,
        peel: prepared.peel,
        train: GraphSummary::of(&prepared.train),
        held_out: prepared.held_out,
        ranked,
        metrics,
    })
}

/// Evaluate several heuristics on one shared split, in the given order.
pub fn compare<I>(
    edges: I,
    heuristics: &[Heuristic],
    config: &ExperimentConfig,
) -> Result<Vec<(Heuristic, EvalReport)>>
where
    I: IntoIterator<Item = (NodeId, NodeId)>,
{
    let prepared = prepare(edges, config)?;
    heuristics
        .iter()
        .map(|&h| score_and_evaluate(&prepared, h, config).map(|(_, m)| (h, m)))
        .collect()
}
