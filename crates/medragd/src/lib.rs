//! MedRAG daemon library: configuration, engine boundary, ProofPath
//! orchestration and the HTTP surface.

pub mod assembler;
pub mod config;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod logging;
pub mod orchestrator;
pub mod redact;
pub mod routes;
pub mod server;
pub mod simple_engine;

pub use config::Config;
pub use engine::{EngineAnswer, EngineError, EngineOutput, RagEngine, ScriptedEngine};
pub use error::ServiceError;
pub use orchestrator::QueryOrchestrator;
pub use server::{router, AppState};
