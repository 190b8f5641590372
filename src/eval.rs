//! Rank-based evaluation against held-out edges.

use tracing::info;

use crate::predict::ScoredPair;
use crate::split::HeldOutEdges;
use crate::topk::top_k;
use crate::{Error, Result};

/// How many top-ranked candidates count as predicted edges.
///
/// Historical runs disagreed (10 fixed, 20 %, 50 %), so this is always configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TopK {
    Count(usize),
    /// Fraction of the candidate count, in `[0, 1]`, rounded down.
    Fraction(f64),
}

impl TopK {
    pub fn resolve(self, candidates: usize) -> Result<usize> {
        match self {
            TopK::Count(k) => Ok(k.min(candidates)),
            TopK::Fraction(f) if (0.0..=1.0).contains(&f) => {
                Ok((candidates as f64 * f).floor() as usize)
            }
            TopK::Fraction(f) => Err(Error::InvalidParameter(format!("top-k fraction {f} outside [0, 1]"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvalConfig {
    pub top_k: TopK,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self { top_k: TopK::Fraction(0.2) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvalReport {
    pub candidates: usize,
    pub k: usize,
    pub held_out: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    /// `TP / |held out|`.
    pub accuracy: f64,
    /// `TP / (TP + FP)`.
    pub precision: f64,
    /// `TP / (TP + FN)`.
    pub recall: f64,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl EvalReport {
    /// Recall relative to a baseline run (typically the random predictor); 0 if the baseline
    /// recalled nothing.
    pub fn relative_to(&self, baseline: &EvalReport) -> f64 {
        if baseline.recall == 0.0 {
            0.0
        } else {
            self.recall / baseline.recall
        }
    }
}

/// Rank `scored`, take the top `k`, and count hits against `held_out`.
///
/// Divisions by zero (no held-out edges, `k == 0`) report 0.
pub fn evaluate(scored: &[ScoredPair], held_out: &HeldOutEdges, config: EvalConfig) -> Result<EvalReport> {
    let k = config.top_k.resolve(scored.len())?;
    let top = top_k(scored, k)?;

    let tp = top.iter().filter(|s| held_out.contains(s.user, s.venue)).count();
    let fp = top.len() - tp;
    let fn_ = held_out.len().saturating_sub(tp);

    let report = EvalReport {
        candidates: scored.len(),
        k: top.len(),
        held_out: held_out.len(),
        true_positives: tp,
        false_positives: fp,
        false_negatives: fn_,
        accuracy: ratio(tp, held_out.len()),
        precision: ratio(tp, tp + fp),
        recall: ratio(tp, tp + fn_),
    };
    info!(
        candidates = report.candidates,
        k = report.k,
        held_out = report.held_out,
        tp = report.true_positives,
        fp = report.false_positives,
        fn_ = report.false_negatives,
        accuracy = report.accuracy,
        precision = report.precision,
        recall = report.recall,
        "evaluated ranking"
    );
    Ok(report)
}
