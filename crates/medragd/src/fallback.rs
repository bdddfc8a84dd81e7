//! Labeled placeholder content for engine failures.
//!
//! Only used when `engine.fallback_on_error` is set. Responses built from it
//! carry `fallback_used = true` so callers can tell it apart from real output.

use crate::engine::{pair_passages, EngineAnswer};
use medrag_shared::RawPassage;

pub const FALLBACK_WARNING: &str =
    "Engine unavailable; response contains placeholder content, not retrieved evidence";

pub fn fallback_answer(question: &str) -> EngineAnswer {
    let answer = format!(
        "[FALLBACK] The retrieval engine could not answer this question. \
         Placeholder response regarding '{}': this is not evidence-based medical guidance. \
         Please consult a healthcare professional.",
        question
    );

    let passages = vec![
        RawPassage::new(
            "fallback_textbook_001",
            "Pediatric Emergency Guidelines",
            format!("Placeholder passage related to: {}", question),
        )
        .with_range(0, 100),
        RawPassage::new(
            "fallback_manual_002",
            "Clinical Reference Manual",
            format!("Placeholder reference related to: {}", question),
        )
        .with_range(0, 120),
    ];

    EngineAnswer {
        answer,
        passages: pair_passages(passages, vec![0.92, 0.88]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_labeled() {
        let answer = fallback_answer("chest pain");
        assert!(answer.answer.starts_with("[FALLBACK]"));
        assert!(answer.answer.contains("chest pain"));
    }

    #[test]
    fn test_fallback_passages() {
        let answer = fallback_answer("q");
        assert_eq!(answer.passages.len(), 2);
        assert_eq!(answer.passages[0].similarity, 0.92);
        assert_eq!(answer.passages[1].similarity, 0.88);
        assert_eq!(answer.passages[0].passage.span(), "chars_0_100");
        assert_eq!(answer.passages[1].passage.span(), "chars_0_120");
    }
}
