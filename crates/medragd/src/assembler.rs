//! Response assembly.
//!
//! Turns the surviving passages and the answer into a `QueryResponse`:
//! contexts and citations always, evidence trail, confidence and audit
//! metadata only when evidence tracking is enabled.

use crate::config::ProofPathConfig;
use crate::fallback::FALLBACK_WARNING;
use medrag_shared::evidence::UNKNOWN_SOURCE;
use medrag_shared::{
    build_evidence_trail, confidence_for, ContextItem, ProofPathMeta, Query, QueryResponse,
    ScoredPassage,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;

/// Citations reported per response
pub const MAX_CITATIONS: usize = 5;

pub const TRACKING_WARNING: &str = "ProofPath evidence tracking active";

/// Names reported in metadata
#[derive(Debug, Clone, PartialEq)]
pub struct EngineInfo {
    pub llm_name: String,
    pub retriever_name: String,
    pub corpus_name: String,
}

/// Clock readings taken by the orchestrator
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    /// Request receipt
    pub received: Instant,
    /// Engine call wall time
    pub retrieve_ms: u64,
    /// Engine call returned
    pub engine_done: Instant,
}

/// Everything known about a request once the engine has answered
#[derive(Debug)]
pub struct Draft<'a> {
    pub query: &'a Query,
    pub engine: &'a EngineInfo,
    pub answer: String,
    /// Passages left after ablation, in rank order
    pub survivors: Vec<ScoredPassage>,
    pub counterfactual_note: Option<String>,
    pub fallback_used: bool,
    pub timings: Timings,
}

#[derive(Debug, Clone)]
pub struct ProofPathAssembler {
    enabled: bool,
    max_passages: usize,
}

impl ProofPathAssembler {
    pub fn new(config: &ProofPathConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_passages: config.max_passages,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn assemble(&self, draft: Draft<'_>) -> QueryResponse {
        let contexts = draft.survivors.iter().map(context_item).collect();
        let citations = citations(&draft.survivors);
        let model_info = draft.engine.llm_name.clone();

        if !self.enabled {
            return QueryResponse {
                answer: draft.answer,
                contexts,
                citations,
                latency_ms: elapsed_ms(draft.timings.received),
                model_info,
                evidence_trail: None,
                answer_confidence: None,
                proofpath_meta: None,
                counterfactual_note: draft.counterfactual_note,
                fallback_used: draft.fallback_used,
            };
        }

        let mut warnings = Vec::new();
        if draft.query.has_exclusions() {
            warnings.push(TRACKING_WARNING.to_string());
        }
        if draft.fallback_used {
            warnings.push(FALLBACK_WARNING.to_string());
        }

        // Weights are computed over every survivor before the cap
        let mut trail = build_evidence_trail(&draft.survivors);
        if trail.len() > self.max_passages {
            warnings.push(format!(
                "Evidence trail truncated to {} of {} passages",
                self.max_passages,
                trail.len()
            ));
            trail.truncate(self.max_passages);
        }
        let confidence = confidence_for(&draft.survivors);

        let token_counts = BTreeMap::from([
            ("prompt".to_string(), draft.query.prompt_word_count() as u64),
            (
                "context".to_string(),
                draft
                    .survivors
                    .iter()
                    .map(|s| s.passage.word_count() as u64)
                    .sum(),
            ),
            (
                "output".to_string(),
                draft.answer.split_whitespace().count() as u64,
            ),
        ]);

        let latency = BTreeMap::from([
            ("retrieve".to_string(), draft.timings.retrieve_ms),
            ("generate".to_string(), elapsed_ms(draft.timings.engine_done)),
        ]);

        let meta = ProofPathMeta {
            retriever_params: BTreeMap::from([
                ("name".to_string(), json!(draft.engine.retriever_name)),
                ("corpus".to_string(), json!(draft.engine.corpus_name)),
                ("k".to_string(), json!(draft.query.top_k())),
            ]),
            generator_params: BTreeMap::from([
                ("model".to_string(), json!(draft.engine.llm_name)),
                ("temperature".to_string(), json!(draft.query.temperature())),
            ]),
            latency_ms: latency,
            token_counts,
            warnings,
        };

        QueryResponse {
            answer: draft.answer,
            contexts,
            citations,
            latency_ms: elapsed_ms(draft.timings.received),
            model_info,
            evidence_trail: Some(trail),
            answer_confidence: Some(confidence),
            proofpath_meta: Some(meta),
            counterfactual_note: draft.counterfactual_note,
            fallback_used: draft.fallback_used,
        }
    }
}

fn context_item(scored: &ScoredPassage) -> ContextItem {
    ContextItem {
        title: scored
            .passage
            .title
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        content: scored.passage.content.clone(),
        source: scored.passage.id.clone(),
    }
}

/// `"<title> - <id>"` for the top passages
pub fn citations(passages: &[ScoredPassage]) -> Vec<String> {
    passages
        .iter()
        .take(MAX_CITATIONS)
        .map(|s| {
            format!(
                "{} - {}",
                s.passage.title.as_deref().unwrap_or(UNKNOWN_SOURCE),
                s.passage.id
            )
        })
        .collect()
}

pub fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrag_shared::{PassageRecord, QueryRequest, RawPassage};

    fn scored(id: &str, title: Option<&str>, similarity: f64) -> ScoredPassage {
        let raw = RawPassage {
            id: Some(id.to_string()),
            title: title.map(str::to_string),
            content: Some("three word content".to_string()),
            ..Default::default()
        };
        ScoredPassage::new(PassageRecord::from_raw(raw, 0), similarity)
    }

    fn info() -> EngineInfo {
        EngineInfo {
            llm_name: "test-llm".to_string(),
            retriever_name: "MedCPT".to_string(),
            corpus_name: "Textbooks".to_string(),
        }
    }

    fn timings() -> Timings {
        let now = Instant::now();
        Timings {
            received: now,
            retrieve_ms: 7,
            engine_done: now,
        }
    }

    fn assembler(enabled: bool, max_passages: usize) -> ProofPathAssembler {
        ProofPathAssembler::new(&ProofPathConfig {
            enabled,
            max_passages,
            positional_ablation: false,
        })
    }

    fn query(exclude: &[&str]) -> Query {
        QueryRequest::new("fever in toddlers")
            .with_k(10)
            .with_temperature(0.2)
            .with_exclusions(exclude.iter().copied())
            .validate(str::to_string)
            .unwrap()
    }

    #[test]
    fn test_disabled_omits_proofpath_fields() {
        let q = query(&[]);
        let engine = info();
        let response = assembler(false, 32).assemble(Draft {
            query: &q,
            engine: &engine,
            answer: "an answer".to_string(),
            survivors: vec![scored("doc_1", Some("T"), 0.9)],
            counterfactual_note: None,
            fallback_used: false,
            timings: timings(),
        });

        assert_eq!(response.contexts.len(), 1);
        assert_eq!(response.model_info, "test-llm");
        assert!(response.evidence_trail.is_none());
        assert!(response.answer_confidence.is_none());
        assert!(response.proofpath_meta.is_none());
    }

    #[test]
    fn test_contexts_and_citations_defaults() {
        let survivors: Vec<ScoredPassage> = (0..7)
            .map(|i| scored(&format!("doc_{}", i), if i == 0 { None } else { Some("Title") }, 0.5))
            .collect();
        let cites = citations(&survivors);

        assert_eq!(cites.len(), 5);
        assert_eq!(cites[0], "Unknown Source - doc_0");
        assert_eq!(cites[1], "Title - doc_1");
        assert_eq!(context_item(&survivors[0]).title, "Unknown");
        assert_eq!(context_item(&survivors[0]).source, "doc_0");
    }

    #[test]
    fn test_enabled_attaches_meta() {
        let q = query(&["doc_9"]);
        let engine = info();
        let response = assembler(true, 32).assemble(Draft {
            query: &q,
            engine: &engine,
            answer: "two words".to_string(),
            survivors: vec![scored("doc_1", Some("A"), 0.95), scored("doc_2", Some("B"), 0.75)],
            counterfactual_note: Some("note".to_string()),
            fallback_used: false,
            timings: timings(),
        });

        assert_eq!(response.answer_confidence, Some(0.83));
        assert_eq!(response.counterfactual_note.as_deref(), Some("note"));

        let trail = response.evidence_trail.unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].weight, 0.95);

        let meta = response.proofpath_meta.unwrap();
        assert_eq!(meta.retriever_params["name"], "MedCPT");
        assert_eq!(meta.retriever_params["corpus"], "Textbooks");
        assert_eq!(meta.retriever_params["k"], 10);
        assert_eq!(meta.generator_params["model"], "test-llm");
        assert_eq!(meta.generator_params["temperature"], 0.2);
        assert_eq!(meta.latency_ms["retrieve"], 7);
        assert!(meta.latency_ms.contains_key("generate"));
        assert_eq!(meta.token_counts["prompt"], 3);
        assert_eq!(meta.token_counts["context"], 6);
        assert_eq!(meta.token_counts["output"], 2);
        assert_eq!(meta.warnings, vec![TRACKING_WARNING.to_string()]);
    }

    #[test]
    fn test_trail_capped_without_changing_weights() {
        let q = query(&[]);
        let engine = info();
        let survivors: Vec<ScoredPassage> =
            (0..4).map(|i| scored(&format!("doc_{}", i), Some("T"), 1.0)).collect();
        let full = build_evidence_trail(&survivors);

        let response = assembler(true, 2).assemble(Draft {
            query: &q,
            engine: &engine,
            answer: String::new(),
            survivors,
            counterfactual_note: None,
            fallback_used: false,
            timings: timings(),
        });

        let trail = response.evidence_trail.unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[..], full[..2]);
        // Contexts are not capped
        assert_eq!(response.contexts.len(), 4);
        let warnings = response.proofpath_meta.unwrap().warnings;
        assert_eq!(warnings, vec!["Evidence trail truncated to 2 of 4 passages".to_string()]);
    }

    #[test]
    fn test_fallback_warning() {
        let q = query(&[]);
        let engine = info();
        let response = assembler(true, 32).assemble(Draft {
            query: &q,
            engine: &engine,
            answer: "x".to_string(),
            survivors: vec![],
            counterfactual_note: None,
            fallback_used: true,
            timings: timings(),
        });

        assert!(response.fallback_used);
        assert_eq!(response.answer_confidence, Some(0.5));
        assert_eq!(
            response.proofpath_meta.unwrap().warnings,
            vec![FALLBACK_WARNING.to_string()]
        );
    }
}
