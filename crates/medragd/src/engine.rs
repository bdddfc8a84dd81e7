//! RAG engine abstraction.
//!
//! The orchestrator only talks to engines through `RagEngine`. Engines may
//! report their result in several shapes (`EngineOutput`); `normalize` turns
//! every shape into the canonical `EngineAnswer` once, at this boundary.
//!
//! Production code uses `SimpleEngine` (see `simple_engine`). Tests use
//! `ScriptedEngine` with a pre-configured output or failure.

use crate::config::EngineConfig;
use crate::redact::sanitize_for_logging;
use crate::simple_engine::SimpleEngine;
use anyhow::Result;
use medrag_shared::{PassageRecord, RawPassage, ScoredPassage};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Answer used when an engine produced nothing usable
pub const NO_ANSWER: &str = "Unable to generate answer";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("engine failed: {0}")]
    Failed(String),

    #[error("engine task panicked")]
    Panicked,
}

/// Every result shape an engine may hand back
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutput {
    /// `(answer, passages, scores)`, the canonical shape
    Triple {
        answer: String,
        passages: Vec<RawPassage>,
        scores: Vec<f64>,
    },
    /// Object with `answer`, `snippets` and `scores` keys
    Mapping(Map<String, Value>),
    /// Bare answer text
    Text(String),
    /// Anything else
    Other(Value),
}

/// Canonical engine result: answer text plus ranked, scored passages
#[derive(Debug, Clone, PartialEq)]
pub struct EngineAnswer {
    pub answer: String,
    pub passages: Vec<ScoredPassage>,
}

impl EngineOutput {
    /// Collapse any shape into `EngineAnswer`
    pub fn normalize(self) -> EngineAnswer {
        match self {
            EngineOutput::Triple {
                answer,
                passages,
                scores,
            } => EngineAnswer {
                answer,
                passages: pair_passages(passages, scores),
            },
            EngineOutput::Mapping(map) => normalize_mapping(map),
            EngineOutput::Text(text) => EngineAnswer {
                answer: if text.is_empty() { NO_ANSWER.to_string() } else { text },
                passages: Vec::new(),
            },
            EngineOutput::Other(value) => EngineAnswer {
                answer: if is_truthy(&value) {
                    match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    }
                } else {
                    NO_ANSWER.to_string()
                },
                passages: Vec::new(),
            },
        }
    }
}

fn normalize_mapping(mut map: Map<String, Value>) -> EngineAnswer {
    let answer = match map.remove("answer") {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let snippets: Vec<Value> = match map.remove("snippets") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };

    let scores: Vec<f64> = match map.remove("scores") {
        Some(Value::Array(items)) => items.iter().map(|v| v.as_f64().unwrap_or(0.0)).collect(),
        _ => Vec::new(),
    };

    warn_on_length_mismatch(snippets.len(), scores.len());

    // A snippet that cannot be parsed takes its score with it
    let pairs = snippets
        .into_iter()
        .zip(scores)
        .filter_map(|(item, score)| match serde_json::from_value::<RawPassage>(item) {
            Ok(raw) => Some((raw, score)),
            Err(e) => {
                warn!(
                    "Dropping malformed engine snippet and its score: {}",
                    sanitize_for_logging(&e.to_string())
                );
                None
            }
        });

    EngineAnswer {
        answer,
        passages: rank_pairs(pairs),
    }
}

/// Zip passages with scores by rank. Extra entries on either side are dropped.
pub fn pair_passages(passages: Vec<RawPassage>, scores: Vec<f64>) -> Vec<ScoredPassage> {
    warn_on_length_mismatch(passages.len(), scores.len());
    rank_pairs(passages.into_iter().zip(scores))
}

fn rank_pairs(pairs: impl Iterator<Item = (RawPassage, f64)>) -> Vec<ScoredPassage> {
    pairs
        .enumerate()
        .map(|(rank, (raw, score))| ScoredPassage::new(PassageRecord::from_raw(raw, rank), score))
        .collect()
}

fn warn_on_length_mismatch(passages: usize, scores: usize) {
    if passages != scores {
        warn!(
            "Engine returned {} passages but {} scores; truncating to {}",
            passages,
            scores,
            passages.min(scores)
        );
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// A retrieval + generation engine. Shared read-only across requests.
pub trait RagEngine: Send + Sync {
    /// Retrieve `k` passages for `question` and generate an answer. May block.
    fn answer(
        &self,
        question: &str,
        options: Option<&BTreeMap<String, String>>,
        k: u32,
    ) -> Result<EngineOutput, EngineError>;

    /// Generator model, for metadata
    fn llm_name(&self) -> &str;

    /// Retriever, for metadata
    fn retriever_name(&self) -> &str;

    /// Corpus, for metadata
    fn corpus_name(&self) -> &str;
}

/// Build the engine selected by `config`
pub fn build(config: &EngineConfig) -> Result<Arc<dyn RagEngine>> {
    let engine = SimpleEngine::from_config(config)?;
    Ok(Arc::new(engine))
}

// ============================================================================
// Scripted Engine (Testing)
// ============================================================================

/// Engine returning a fixed output or failing with a fixed reason
pub struct ScriptedEngine {
    script: Result<EngineOutput, EngineError>,
    llm_name: String,
    retriever_name: String,
    corpus_name: String,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn returning(output: EngineOutput) -> Self {
        Self::with_script(Ok(output))
    }

    pub fn failing(reason: &str) -> Self {
        Self::with_script(Err(EngineError::Failed(reason.to_string())))
    }

    fn with_script(script: Result<EngineOutput, EngineError>) -> Self {
        Self {
            script,
            llm_name: "scripted-llm".to_string(),
            retriever_name: "scripted-retriever".to_string(),
            corpus_name: "scripted-corpus".to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_names(mut self, llm: &str, retriever: &str, corpus: &str) -> Self {
        self.llm_name = llm.to_string();
        self.retriever_name = retriever.to_string();
        self.corpus_name = corpus.to_string();
        self
    }

    /// Number of `answer` calls so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RagEngine for ScriptedEngine {
    fn answer(
        &self,
        _question: &str,
        _options: Option<&BTreeMap<String, String>>,
        _k: u32,
    ) -> Result<EngineOutput, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script.clone()
    }

    fn llm_name(&self) -> &str {
        &self.llm_name
    }

    fn retriever_name(&self) -> &str {
        &self.retriever_name
    }

    fn corpus_name(&self) -> &str {
        &self.corpus_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(id: &str) -> RawPassage {
        RawPassage::new(id, "Title", "body text")
    }

    #[test]
    fn test_triple_normalizes_in_rank_order() {
        let answer = EngineOutput::Triple {
            answer: "A".to_string(),
            passages: vec![raw("doc_1"), raw("doc_2")],
            scores: vec![0.9, 0.8],
        }
        .normalize();

        assert_eq!(answer.answer, "A");
        assert_eq!(answer.passages.len(), 2);
        assert_eq!(answer.passages[1].passage.id, "doc_2");
        assert_eq!(answer.passages[1].similarity, 0.8);
    }

    #[test]
    fn test_length_mismatch_truncates() {
        let answer = EngineOutput::Triple {
            answer: "A".to_string(),
            passages: vec![raw("doc_1"), raw("doc_2"), raw("doc_3")],
            scores: vec![0.9],
        }
        .normalize();
        assert_eq!(answer.passages.len(), 1);
    }

    #[test]
    fn test_mapping_shape() {
        let value = json!({
            "answer": "Epinephrine",
            "snippets": [{"id": "doc_1", "title": "Anaphylaxis", "content": "First line"}],
            "scores": [0.95]
        });
        let Value::Object(map) = value else { unreachable!() };
        let answer = EngineOutput::Mapping(map).normalize();

        assert_eq!(answer.answer, "Epinephrine");
        assert_eq!(answer.passages[0].passage.title.as_deref(), Some("Anaphylaxis"));
        assert_eq!(answer.passages[0].similarity, 0.95);
    }

    #[test]
    fn test_mapping_unparseable_snippet_drops_its_score() {
        let value = json!({
            "answer": "Croup",
            "snippets": [
                {"id": "doc_1", "title": "Croup", "content": "Barking cough"},
                {"id": "doc_bad", "title": ["not", "a", "string"]},
                {"id": "doc_3", "title": "Stridor", "content": "Noisy breathing"}
            ],
            "scores": [0.95, 0.50, 0.10]
        });
        let Value::Object(map) = value else { unreachable!() };
        let answer = EngineOutput::Mapping(map).normalize();

        assert_eq!(answer.passages.len(), 2);
        assert_eq!(answer.passages[0].passage.id, "doc_1");
        assert_eq!(answer.passages[0].similarity, 0.95);
        assert_eq!(answer.passages[1].passage.id, "doc_3");
        assert_eq!(answer.passages[1].similarity, 0.10);
    }

    #[test]
    fn test_mapping_loose_snippet_fields_are_kept() {
        let value = json!({
            "answer": "Fever",
            "snippets": [
                {"id": "doc_bad", "start": -1, "end": 20.5, "content": "Fever workup"},
                {"id": "doc_good", "content": "Antipyretics"}
            ],
            "scores": [0.95, 0.10]
        });
        let Value::Object(map) = value else { unreachable!() };
        let answer = EngineOutput::Mapping(map).normalize();

        assert_eq!(answer.passages.len(), 2);
        assert_eq!(answer.passages[0].passage.id, "doc_bad");
        assert_eq!(answer.passages[0].passage.span(), "chars_0_20");
        assert_eq!(answer.passages[1].passage.id, "doc_good");
        assert_eq!(answer.passages[1].similarity, 0.10);
    }

    #[test]
    fn test_mapping_missing_keys() {
        let answer = EngineOutput::Mapping(Map::new()).normalize();
        assert_eq!(answer.answer, "");
        assert!(answer.passages.is_empty());
    }

    #[test]
    fn test_text_and_other_shapes() {
        assert_eq!(EngineOutput::Text("plain".into()).normalize().answer, "plain");
        assert_eq!(EngineOutput::Text(String::new()).normalize().answer, NO_ANSWER);
        assert_eq!(EngineOutput::Other(Value::Null).normalize().answer, NO_ANSWER);
        assert_eq!(EngineOutput::Other(json!(42)).normalize().answer, "42");
        assert_eq!(EngineOutput::Other(json!([])).normalize().answer, NO_ANSWER);
    }

    #[test]
    fn test_scripted_engine_counts_calls() {
        let engine = ScriptedEngine::failing("boom");
        assert_eq!(engine.call_count(), 0);
        assert_eq!(
            engine.answer("q", None, 5),
            Err(EngineError::Failed("boom".to_string()))
        );
        assert_eq!(engine.call_count(), 1);
    }
}
