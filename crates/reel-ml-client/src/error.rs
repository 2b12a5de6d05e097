//! Inference client errors.

use thiserror::Error;

pub type MlResult<T> = Result<T, MlError>;

#[derive(Debug, Error)]
pub enum MlError {
    #[error("Service not configured: {0}")]
    NotConfigured(String),

    #[error("Service returned {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{task} output rejected: {reason}")]
    ContractViolation { task: &'static str, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MlError {
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    pub fn contract(task: &'static str, reason: impl Into<String>) -> Self {
        Self::ContractViolation {
            task,
            reason: reason.into(),
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            MlError::RequestFailed { status, .. } => *status == 429 || *status >= 500,
            MlError::Network(_)
            | MlError::InvalidResponse(_)
            | MlError::ContractViolation { .. }
            | MlError::Json(_) => true,
            MlError::NotConfigured(_) | MlError::Io(_) => false,
        }
    }
}
