//! Shared types and the ProofPath evidence core for the MedRAG service.
//!
//! Everything in this crate is pure: no I/O, no clocks, no global state.
//! The daemon (`medragd`) and the CLI (`medragctl`) both build on it.

pub mod ablation;
pub mod confidence;
pub mod error;
pub mod evidence;
pub mod passage;
pub mod query;
pub mod response;

pub use ablation::{apply_ablation, counterfactual_note, AblationPolicy, AblationResult};
pub use confidence::{confidence_for, estimate_confidence};
pub use error::ValidationError;
pub use evidence::{build_evidence_trail, evidence_weight, EvidenceRef};
pub use passage::{positional_id, PassageRecord, RawPassage, ScoredPassage};
pub use query::{Query, QueryRequest};
pub use response::{ContextItem, ErrorBody, HealthResponse, ProofPathMeta, QueryResponse};

/// Round to 3 decimal places, the precision every reported score uses.
pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
