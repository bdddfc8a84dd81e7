//! Service errors and their HTTP mapping.

use crate::redact::sanitize_for_logging;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use medrag_shared::{ErrorBody, ValidationError};
use thiserror::Error;
use tracing::error;

/// Detail reported for internal failures; the cause is logged only
pub const INTERNAL_DETAIL: &str = "Internal server error";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("MedRAG service not initialized")]
    NotReady,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Body was not a well-formed request
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Engine failure: {0}")]
    EngineFailure(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Validation(ValidationError::MissingExclusions) => StatusCode::BAD_REQUEST,
            ServiceError::Validation(_) | ServiceError::InvalidBody(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServiceError::EngineFailure(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable `type` in the error body
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotReady => "not_ready",
            ServiceError::Validation(e) => e.kind(),
            ServiceError::InvalidBody(_) => "invalid_body",
            ServiceError::EngineFailure(_) => "engine_failure",
            ServiceError::Internal(_) => "service_error",
        }
    }

    pub fn body(&self) -> ErrorBody {
        let detail = match self {
            ServiceError::Internal(_) => INTERNAL_DETAIL.to_string(),
            ServiceError::EngineFailure(_) => sanitize_for_logging(&self.to_string()),
            other => other.to_string(),
        };
        ErrorBody::new(detail, self.kind())
    }

    /// Sanitized cause of an internal error, for the server log only
    pub fn log_detail(&self) -> Option<String> {
        match self {
            ServiceError::Internal(cause) => Some(sanitize_for_logging(cause)),
            _ => None,
        }
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        if let Some(cause) = self.log_detail() {
            error!("Internal error: {}", cause);
        }
        (self.status(), Json(self.body())).into_response()
    }
}
