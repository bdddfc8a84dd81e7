//! MedRAG daemon - medical RAG answers with ProofPath evidence tracking.

use anyhow::Result;
use medragd::{config::Config, engine, logging, server, AppState, QueryOrchestrator};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    logging::init(&config.logging)?;

    info!("MedRAG daemon v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "  ProofPath evidence tracking: {}",
        if config.proofpath.enabled { "enabled" } else { "disabled" }
    );

    // Keep serving /health even if the engine cannot be built
    let engine = match engine::build(&config.engine) {
        Ok(engine) => {
            info!(
                "  Engine ready: llm={} retriever={} corpus={}",
                engine.llm_name(),
                engine.retriever_name(),
                engine.corpus_name()
            );
            Some(engine)
        }
        Err(e) => {
            error!("  Failed to initialize engine: {:#}", e);
            None
        }
    };

    let orchestrator = QueryOrchestrator::new(engine, &config.proofpath, &config.engine);
    server::run(&config.server, AppState::new(orchestrator)).await
}
