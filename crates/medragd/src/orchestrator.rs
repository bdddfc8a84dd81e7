//! Query orchestration.
//!
//! One entry point per request: call the engine, normalize its output,
//! optionally ablate, then hand everything to the assembler. Holds no
//! per-request state; the engine handle is shared read-only.

use crate::assembler::{elapsed_ms, Draft, EngineInfo, ProofPathAssembler, Timings};
use crate::config::{EngineConfig, ProofPathConfig};
use crate::engine::{EngineError, RagEngine};
use crate::error::ServiceError;
use crate::fallback::fallback_answer;
use crate::redact::{sanitize_for_logging, sanitize_value};
use medrag_shared::{apply_ablation, AblationPolicy, Query, QueryResponse};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub struct QueryOrchestrator {
    engine: Option<Arc<dyn RagEngine>>,
    assembler: ProofPathAssembler,
    policy: AblationPolicy,
    fallback_on_error: bool,
}

impl QueryOrchestrator {
    /// `engine` is `None` when startup failed to build one; queries are then rejected.
    pub fn new(
        engine: Option<Arc<dyn RagEngine>>,
        proofpath: &ProofPathConfig,
        engine_config: &EngineConfig,
    ) -> Self {
        Self {
            engine,
            assembler: ProofPathAssembler::new(proofpath),
            policy: proofpath.ablation_policy(),
            fallback_on_error: engine_config.fallback_on_error,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    pub fn proofpath_enabled(&self) -> bool {
        self.assembler.enabled()
    }

    pub async fn run(&self, query: Query) -> Result<QueryResponse, ServiceError> {
        let received = Instant::now();
        let engine = self.engine.clone().ok_or(ServiceError::NotReady)?;
        let query_id = format!("query_{}", chrono::Utc::now().timestamp_millis());

        let request_log = sanitize_value(json!({
            "query": query.text(),
            "options": query.options(),
            "k": query.top_k(),
            "temperature": query.temperature(),
            "ablate": query.exclude(),
        }));
        info!("[{}] Processing query: {}", query_id, request_log);

        let retrieve_start = Instant::now();
        let handle = {
            let engine = Arc::clone(&engine);
            let text = query.text().to_string();
            let options = query.options().cloned();
            let k = query.top_k();
            tokio::task::spawn_blocking(move || engine.answer(&text, options.as_ref(), k))
        };
        let result = match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(EngineError::Panicked),
            Err(e) => return Err(ServiceError::Internal(format!("engine task: {}", e))),
        };
        let retrieve_ms = elapsed_ms(retrieve_start);
        let engine_done = Instant::now();

        // Engine messages may echo passage text, so they are sanitized first
        let (answer, fallback_used) = match result {
            Ok(output) => (output.normalize(), false),
            Err(e) if self.fallback_on_error => {
                let reason = sanitize_for_logging(&e.to_string());
                warn!("[{}] {}; substituting fallback content", query_id, reason);
                (fallback_answer(query.text()), true)
            }
            Err(e) => {
                let reason = sanitize_for_logging(&e.to_string());
                error!("[{}] Query failed: {}", query_id, reason);
                return Err(ServiceError::EngineFailure(reason));
            }
        };

        let (survivors, counterfactual_note) =
            if query.has_exclusions() && self.assembler.enabled() {
                let ablation = apply_ablation(answer.passages, query.exclude(), self.policy);
                info!(
                    "[{}] Ablation removed {} passages, {} remain",
                    query_id,
                    ablation.removed_count,
                    ablation.kept.len()
                );
                (ablation.kept, ablation.note)
            } else {
                (answer.passages, None)
            };

        let info = EngineInfo {
            llm_name: engine.llm_name().to_string(),
            retriever_name: engine.retriever_name().to_string(),
            corpus_name: engine.corpus_name().to_string(),
        };

        let response = self.assembler.assemble(Draft {
            query: &query,
            engine: &info,
            answer: answer.answer,
            survivors,
            counterfactual_note,
            fallback_used,
            timings: Timings {
                received,
                retrieve_ms,
                engine_done,
            },
        });

        info!(
            "[{}] Query completed in {}ms, {} contexts",
            query_id,
            response.latency_ms,
            response.contexts.len()
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineOutput, ScriptedEngine};
    use medrag_shared::{QueryRequest, RawPassage};

    fn three_passages() -> EngineOutput {
        EngineOutput::Triple {
            answer: "Viral infections are most common".to_string(),
            passages: vec![
                RawPassage::new("doc_1", "A", "alpha"),
                RawPassage::new("doc_2", "B", "beta"),
                RawPassage::new("doc_3", "C", "gamma"),
            ],
            scores: vec![0.9, 0.8, 0.7],
        }
    }

    fn orchestrator(engine: Option<Arc<dyn RagEngine>>, enabled: bool, fallback: bool) -> QueryOrchestrator {
        let proofpath = ProofPathConfig {
            enabled,
            ..ProofPathConfig::default()
        };
        let engine_config = EngineConfig {
            fallback_on_error: fallback,
            ..EngineConfig::default()
        };
        QueryOrchestrator::new(engine, &proofpath, &engine_config)
    }

    fn query(exclude: &[&str]) -> Query {
        QueryRequest::new("fever causes")
            .with_exclusions(exclude.iter().copied())
            .validate(str::to_string)
            .unwrap()
    }

    #[tokio::test]
    async fn test_not_ready_without_engine() {
        let orch = orchestrator(None, true, true);
        assert!(!orch.is_ready());
        assert!(matches!(orch.run(query(&[])).await, Err(ServiceError::NotReady)));
    }

    #[tokio::test]
    async fn test_ablation_when_enabled() {
        let engine = Arc::new(ScriptedEngine::returning(three_passages()));
        let orch = orchestrator(Some(engine), true, false);

        let response = orch.run(query(&["doc_1", "doc_3"])).await.unwrap();
        assert_eq!(response.contexts.len(), 1);
        assert_eq!(response.contexts[0].source, "doc_2");
        assert_eq!(
            response.counterfactual_note.as_deref(),
            Some("Excluded 2 passages based on ablation criteria: doc_1, doc_3")
        );
        assert_eq!(response.answer_confidence, Some(0.5));
    }

    #[tokio::test]
    async fn test_ablation_skipped_when_disabled() {
        let engine = Arc::new(ScriptedEngine::returning(three_passages()));
        let orch = orchestrator(Some(engine), false, false);

        let response = orch.run(query(&["doc_1"])).await.unwrap();
        assert_eq!(response.contexts.len(), 3);
        assert!(response.counterfactual_note.is_none());
        assert!(response.evidence_trail.is_none());
    }

    #[tokio::test]
    async fn test_engine_failure_without_fallback() {
        let engine = Arc::new(ScriptedEngine::failing("index offline"));
        let orch = orchestrator(Some(engine), true, false);

        match orch.run(query(&[])).await {
            Err(ServiceError::EngineFailure(reason)) => assert!(reason.contains("index offline")),
            other => panic!("expected engine failure, got {:?}", other.map(|r| r.answer)),
        }
    }

    #[tokio::test]
    async fn test_engine_failure_reason_is_sanitized() {
        let engine = Arc::new(ScriptedEngine::failing(
            "no match for patient 123-45-6789 (jdoe@hospital.org)",
        ));
        let orch = orchestrator(Some(engine), true, false);

        match orch.run(query(&[])).await {
            Err(ServiceError::EngineFailure(reason)) => {
                assert!(reason.contains("[SSN-REDACTED]"));
                assert!(reason.contains("[EMAIL-REDACTED]"));
                assert!(!reason.contains("123-45-6789"));
                assert!(!reason.contains("jdoe"));
            }
            other => panic!("expected engine failure, got {:?}", other.map(|r| r.answer)),
        }
    }

    #[tokio::test]
    async fn test_engine_failure_with_fallback() {
        let engine = Arc::new(ScriptedEngine::failing("index offline"));
        let orch = orchestrator(Some(engine), true, true);

        let response = orch.run(query(&[])).await.unwrap();
        assert!(response.fallback_used);
        assert!(response.answer.starts_with("[FALLBACK]"));
        assert_eq!(response.contexts.len(), 2);
    }

    #[tokio::test]
    async fn test_engine_names_flow_into_meta() {
        let engine = Arc::new(
            ScriptedEngine::returning(three_passages()).with_names("gpt-x", "BM25", "PubMed"),
        );
        let orch = orchestrator(Some(engine), true, false);

        let response = orch.run(query(&[])).await.unwrap();
        assert_eq!(response.model_info, "gpt-x");
        let meta = response.proofpath_meta.unwrap();
        assert_eq!(meta.retriever_params["name"], "BM25");
        assert_eq!(meta.retriever_params["corpus"], "PubMed");
        assert!(meta.warnings.is_empty());
    }
}
