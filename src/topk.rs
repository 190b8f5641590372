//! Ranking utilities.
//!
//! Order is score descending; equal scores keep candidate generation order (`index`
//! ascending). Non-finite scores are rejected rather than ordered.

use ordered_float::NotNan;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::predict::ScoredPair;
use crate::{Error, Result};

fn checked(s: &ScoredPair) -> Result<NotNan<f64>> {
    if !s.score.is_finite() {
        return Err(Error::NonFiniteScore { user: s.user, venue: s.venue });
    }
    NotNan::new(s.score).map_err(|_| Error::NonFiniteScore { user: s.user, venue: s.venue })
}

fn by_rank(a: &ScoredPair, b: &ScoredPair) -> std::cmp::Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then(a.index.cmp(&b.index))
}

/// Full ranking of `scored`.
pub fn rank(mut scored: Vec<ScoredPair>) -> Result<Vec<ScoredPair>> {
    for s in &scored {
        checked(s)?;
    }
    scored.sort_by(by_rank);
    Ok(scored)
}

/// The best `k` entries of `scored`, ranked. Same order as `rank(scored)[..k]`.
pub fn top_k(scored: &[ScoredPair], k: usize) -> Result<Vec<ScoredPair>> {
    if k == 0 || scored.is_empty() {
        return Ok(Vec::new());
    }
    // Min-heap over (score, Reverse(index)): the root is the weakest kept entry.
    let mut heap = BinaryHeap::with_capacity(k + 1);
    for (pos, s) in scored.iter().enumerate() {
        let key = (checked(s)?, Reverse(s.index));
        if heap.len() < k {
            heap.push(Reverse((key, pos)));
        } else if let Some(Reverse((weakest, _))) = heap.peek() {
            if key > *weakest {
                heap.pop();
                heap.push(Reverse((key, pos)));
            }
        }
    }
    let mut results: Vec<ScoredPair> = heap.into_iter().map(|Reverse((_, pos))| scored[pos]).collect();
    results.sort_by(by_rank);
    Ok(results)
}
