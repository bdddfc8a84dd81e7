//! Evidence trail construction.
//!
//! Turns the ranked (possibly ablated) passage list into weighted references.
//! Weight = rank decay * similarity:
//!
//! ```text
//! weight_i = max(0.1, (n - i) / n) * min(1.0, similarity_i)
//! ```
//!
//! The rank term falls linearly from 1.0 at rank 0 to 1/n at the last rank,
//! floored at 0.1, so a weak top hit cannot dominate and a strong tail hit
//! is never zeroed out by rank alone.

use crate::passage::{positional_id, ScoredPassage};
use crate::round3;
use serde::{Deserialize, Serialize};

/// Title reported when the engine gave none.
pub const UNKNOWN_SOURCE: &str = "Unknown Source";

/// Floor on the rank-decay term.
pub const MIN_RANK_FACTOR: f64 = 0.1;

/// One weighted, attributable passage in an answer's evidence trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRef {
    /// Positional id (`passage_<rank>`) in the post-ablation order.
    pub id: String,
    /// The passage's native id.
    pub source_id: String,
    #[serde(default)]
    pub doc_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub span: Option<String>,
    pub similarity: f64,
    pub weight: f64,
    #[serde(default)]
    pub recency_signal: Option<f64>,
}

/// Weight for the passage at `rank` out of `total` survivors.
pub fn evidence_weight(rank: usize, total: usize, similarity: f64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rank_factor = ((total - rank.min(total)) as f64 / total as f64).max(MIN_RANK_FACTOR);
    round3(rank_factor * similarity.min(1.0))
}

/// Build the evidence trail: one reference per passage, same order.
pub fn build_evidence_trail(passages: &[ScoredPassage]) -> Vec<EvidenceRef> {
    let total = passages.len();

    passages
        .iter()
        .enumerate()
        .map(|(rank, scored)| {
            let passage = &scored.passage;
            let similarity = scored.similarity.clamp(0.0, 1.0);
            EvidenceRef {
                id: positional_id(rank),
                source_id: passage.id.clone(),
                doc_url: passage.url.clone(),
                title: Some(
                    passage
                        .title
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
                ),
                published_at: passage.published_at.clone(),
                span: Some(passage.span()),
                similarity,
                weight: evidence_weight(rank, total, similarity),
                recency_signal: None,
            }
        })
        .collect()
}
