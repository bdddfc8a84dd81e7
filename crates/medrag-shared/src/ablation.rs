//! Ablation: counterfactual filtering of retrieved passages.
//!
//! A passage is dropped when its native id or its source id equals one of
//! the caller's exclusion ids. Matching is exact. A passage without an
//! explicit source id is matched on its title instead.
//!
//! Positional ids (`passage_<n>`) are only matched when
//! `AblationPolicy::match_positional_ids` is set. A positional id is computed
//! from the number of passages kept so far, so it shifts as soon as an earlier
//! passage is removed; an id copied from a previous response can therefore
//! select a different passage than the caller saw.

use crate::passage::{positional_id, ScoredPassage};
use serde::{Deserialize, Serialize};

/// Which identifier spaces exclusion ids are matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AblationPolicy {
    /// Also match `passage_<kept-so-far>` positional ids.
    #[serde(default)]
    pub match_positional_ids: bool,
}

impl AblationPolicy {
    /// Native id and source id only.
    pub fn stable() -> Self {
        Self {
            match_positional_ids: false,
        }
    }

    pub fn with_positional_ids() -> Self {
        Self {
            match_positional_ids: true,
        }
    }
}

/// Outcome of an ablation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AblationResult {
    pub kept: Vec<ScoredPassage>,
    pub removed_count: usize,
    /// Set iff at least one exclusion id was supplied.
    pub note: Option<String>,
}

/// Human-readable summary attached to an ablated response.
pub fn counterfactual_note(removed_count: usize, exclude: &[String]) -> String {
    format!(
        "Excluded {} passages based on ablation criteria: {}",
        removed_count,
        exclude.join(", ")
    )
}

/// Drop every passage matching an exclusion id, preserving survivor order.
///
/// With no exclusion ids the input is returned untouched and no note is set.
pub fn apply_ablation(
    passages: Vec<ScoredPassage>,
    exclude: &[String],
    policy: AblationPolicy,
) -> AblationResult {
    if exclude.is_empty() {
        return AblationResult {
            kept: passages,
            removed_count: 0,
            note: None,
        };
    }

    let mut kept: Vec<ScoredPassage> = Vec::with_capacity(passages.len());
    let mut removed_count = 0;

    for scored in passages {
        let matches = |candidate: &str| exclude.iter().any(|id| id == candidate);

        let mut excluded =
            matches(scored.passage.id.as_str()) || matches(scored.passage.source_id.as_str());
        if !excluded && policy.match_positional_ids {
            excluded = matches(positional_id(kept.len()).as_str());
        }

        if excluded {
            removed_count += 1;
        } else {
            kept.push(scored);
        }
    }

    AblationResult {
        kept,
        removed_count,
        note: Some(counterfactual_note(removed_count, exclude)),
    }
}
