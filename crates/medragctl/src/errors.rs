//! Error codes and exit status for medragctl

use thiserror::Error;

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors (including service-reported errors)
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Exit code when the service returns a body we cannot parse
pub const EXIT_INVALID_RESPONSE: i32 = 65;

/// Exit code when the service is unreachable
pub const EXIT_SERVICE_UNAVAILABLE: i32 = 70;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(
        "Cannot reach MedRAG service at {url}: {reason}\n\n\
         Is medragd running? Start it with `medragd` or pass --url."
    )]
    Unreachable { url: String, reason: String },

    #[error("Invalid response from service: {0}")]
    InvalidResponse(String),

    /// Non-2xx answer carrying the service's error body
    #[error("Service returned {status} ({kind}): {detail}")]
    Service {
        status: u16,
        kind: String,
        detail: String,
    },
}

impl ClientError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::Unreachable { .. } => EXIT_SERVICE_UNAVAILABLE,
            ClientError::InvalidResponse(_) => EXIT_INVALID_RESPONSE,
            ClientError::Service { .. } => EXIT_GENERAL_ERROR,
        }
    }
}

/// Exit code for any error bubbled up to main
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ClientError>()
        .map_or(EXIT_GENERAL_ERROR, ClientError::exit_code)
}
