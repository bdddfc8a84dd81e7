//! Response types for the query, ablation and health endpoints.

use crate::evidence::EvidenceRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STATUS_HEALTHY: &str = "healthy";
pub const STATUS_UNHEALTHY: &str = "unhealthy";

/// One surviving passage as shown to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub title: String,
    pub content: String,
    pub source: String,
}

/// Audit metadata attached when evidence tracking is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofPathMeta {
    pub retriever_params: BTreeMap<String, serde_json::Value>,
    pub generator_params: BTreeMap<String, serde_json::Value>,
    /// Per-phase wall-clock durations (`retrieve`, `generate`)
    pub latency_ms: BTreeMap<String, u64>,
    /// Whitespace word counts (`prompt`, `context`, `output`), not subword tokens
    pub token_counts: BTreeMap<String, u64>,
    pub warnings: Vec<String>,
}

/// Answer plus everything needed to audit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub contexts: Vec<ContextItem>,
    pub citations: Vec<String>,
    /// Request receipt to assembly, milliseconds
    pub latency_ms: u64,
    pub model_info: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_trail: Option<Vec<EvidenceRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proofpath_meta: Option<ProofPathMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterfactual_note: Option<String>,
    /// True when the engine failed and fallback content was substituted
    #[serde(default)]
    pub fallback_used: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub medrag_initialized: bool,
    pub proofpath_enabled: bool,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == STATUS_HEALTHY
    }
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            kind: kind.into(),
        }
    }
}
