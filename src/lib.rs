//! `linkpred`: link prediction over bipartite user–venue interaction graphs.
//!
//! Given a graph with some edges withheld, rank candidate `(user, venue)` pairs by a
//! neighborhood heuristic and measure the ranking against the withheld edges.
//!
//! Data flow:
//! edge list → [`BipartiteGraph`] → [`peel`] (optional) → [`split_edges`] →
//! [`NeighborCache`] → [`score_all`] → [`evaluate`].
//!
//! Public invariants (must not drift):
//! - **Bipartite**: every edge joins a user (`id <= max_user_id`) to a venue; violating inserts
//!   fail with [`Error::NotBipartite`].
//! - **Higher is more similar**: every heuristic, distance included (it returns `-hops`).
//! - **Determinism**: randomized operators are driven by an explicit seed or RNG, and rankings
//!   break score ties by candidate generation order, so results do not depend on thread count.
//! - **Snapshots**: a [`NeighborCache`] is tied to the graph snapshot it was built from and is
//!   never rebuilt lazily.

pub mod cache;
pub mod distance;
pub mod eval;
pub mod graph;
pub mod io;
pub mod pipeline;
pub mod predict;
pub mod sample;
pub mod similarity;
pub mod split;
pub mod stats;
pub mod topk;

pub use cache::NeighborCache;
pub use distance::{ComponentIndex, DistanceConfig, DistanceEstimator};
pub use eval::{evaluate, EvalConfig, EvalReport, TopK};
pub use graph::{BipartiteGraph, Edge, NeighborRef, NodeId, Partition};
pub use io::{parse_edge_list, read_edge_list, write_edge_list, write_ranked};
pub use pipeline::{compare, prepare, run, score_and_evaluate, ExperimentConfig, ExperimentReport, Prepared};
pub use predict::{candidates, score_all, Candidate, CandidateConfig, ScoredPair};
#[cfg(feature = "parallel")]
pub use predict::score_all_parallel;
pub use sample::{peel, peel_in_place, PeelConfig, PeelReport, PeelStats};
pub use similarity::{
    adamic_adar_user, adamic_adar_venue, common_neighbors_user, common_neighbors_venue,
    jaccard_coefficient, katz, preferential_attachment, random_score, Heuristic, KatzConfig,
    Scorer,
};
pub use split::{split_edges, split_prefix, HeldOutEdges, SplitConfig};
pub use stats::{component_size_histogram, degree_distribution, GraphSummary};
pub use topk::{rank, top_k};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown node {node} (graph snapshot {snapshot})")]
    UnknownNode { node: NodeId, snapshot: u64 },
    #[error("invalid pair: both ends are node {0}")]
    InvalidPair(NodeId),
    #[error("nodes {x} and {y} lie in different connected components")]
    DisconnectedPair { x: NodeId, y: NodeId },
    #[error("no path between {x} and {y} found after {steps} expansion steps")]
    DistanceUnreachable { x: NodeId, y: NodeId, steps: usize },
    #[error("jaccard coefficient undefined for {x} and {y}: empty neighbor union")]
    DivideByZero { x: NodeId, y: NodeId },
    #[error("neighbor cache has {entries} entries but graph snapshot {snapshot} has {nodes} nodes")]
    CacheBuild { entries: usize, nodes: usize, snapshot: u64 },
    #[error("neighbor cache built from snapshot {cache} used against snapshot {graph}")]
    StaleCache { cache: u64, graph: u64 },
    #[error("edge ({a}, {b}) does not join a user to a venue")]
    NotBipartite { a: NodeId, b: NodeId },
    #[error("non-finite score for pair ({user}, {venue})")]
    NonFiniteScore { user: NodeId, venue: NodeId },
    #[error("line {line}: {reason}")]
    InputFormat { line: usize, reason: String },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Structural violations mean the graph itself is corrupt; callers must abort the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::NotBipartite { .. } | Error::CacheBuild { .. } | Error::StaleCache { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
