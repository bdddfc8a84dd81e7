//! Answer confidence from the retrieval score distribution.
//!
//! Rewards a high, tight cluster of top scores and penalizes dispersion.
//! Output is always within [0.2, 0.95], or exactly 0.5 when there are fewer
//! than two scores to compare.

use crate::passage::ScoredPassage;
use crate::round3;

/// Returned when agreement cannot be assessed (0 or 1 score).
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;
pub const CONFIDENCE_FLOOR: f64 = 0.2;
pub const CONFIDENCE_CEILING: f64 = 0.95;
/// Largest amount dispersion may subtract.
pub const MAX_VARIANCE_PENALTY: f64 = 0.3;
pub const VARIANCE_PENALTY_FACTOR: f64 = 2.0;
/// How many of the best scores are considered.
pub const TOP_SCORES: usize = 5;

/// Confidence for a set of similarity scores.
pub fn estimate_confidence(scores: &[f64]) -> f64 {
    if scores.len() < 2 {
        return NEUTRAL_CONFIDENCE;
    }

    let mut top: Vec<f64> = scores.to_vec();
    top.sort_by(|a, b| b.total_cmp(a));
    top.truncate(TOP_SCORES);

    let count = top.len() as f64;
    let mean = top.iter().sum::<f64>() / count;
    let variance = top.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / count;

    let base = mean.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING);
    let penalty = (variance * VARIANCE_PENALTY_FACTOR).min(MAX_VARIANCE_PENALTY);

    round3((base - penalty).max(CONFIDENCE_FLOOR))
}

/// Confidence over the similarities of a passage list.
pub fn confidence_for(passages: &[ScoredPassage]) -> f64 {
    let scores: Vec<f64> = passages.iter().map(|p| p.similarity).collect();
    estimate_confidence(&scores)
}
