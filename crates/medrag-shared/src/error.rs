//! Error types for request validation.

use thiserror::Error;

/// Reasons a request is rejected before any engine or evidence logic runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("query text must not be empty")]
    EmptyQuery,

    #[error("k must be between 1 and 100, got {0}")]
    TopKOutOfRange(u32),

    #[error("temperature must be between 0.0 and 1.0, got {0}")]
    TemperatureOutOfRange(f64),

    #[error("Ablation endpoint requires 'ablate' parameter")]
    MissingExclusions,
}

impl ValidationError {
    /// Machine-readable kind used in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::EmptyQuery => "empty_query",
            ValidationError::TopKOutOfRange(_) => "k_out_of_range",
            ValidationError::TemperatureOutOfRange(_) => "temperature_out_of_range",
            ValidationError::MissingExclusions => "missing_ablate",
        }
    }
}
