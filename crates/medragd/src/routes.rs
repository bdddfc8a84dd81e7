//! API routes for medragd

use crate::error::ServiceError;
use crate::redact::redact_query_text;
use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use medrag_shared::response::{STATUS_HEALTHY, STATUS_UNHEALTHY};
use medrag_shared::{HealthResponse, QueryRequest, QueryResponse};
use std::sync::Arc;
use tracing::debug;

type AppStateArc = Arc<AppState>;

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    let initialized = state.orchestrator.is_ready();
    let status = if initialized { STATUS_HEALTHY } else { STATUS_UNHEALTHY };
    Json(HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        medrag_initialized: initialized,
        proofpath_enabled: state.orchestrator.proofpath_enabled(),
    })
}

// ============================================================================
// Query Routes
// ============================================================================

pub fn query_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/query", post(query))
        .route("/ablate", post(ablate))
}

async fn query(
    State(state): State<AppStateArc>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ServiceError> {
    let Json(req) = body?;
    let query = req.validate(redact_query_text)?;
    debug!("  /query k={} exclusions={}", query.top_k(), query.exclude().len());

    let response = state.orchestrator.run(query).await?;
    Ok(Json(response))
}

/// Same as `/query`, but exclusion ids are mandatory
async fn ablate(
    State(state): State<AppStateArc>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ServiceError> {
    let Json(req) = body?;
    let query = req.validate_ablation(redact_query_text)?;
    debug!("  /ablate k={} exclusions={}", query.top_k(), query.exclude().len());

    let response = state.orchestrator.run(query).await?;
    Ok(Json(response))
}
