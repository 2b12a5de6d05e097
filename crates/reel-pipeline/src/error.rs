//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{task} generation failed after {attempts} attempts: {summary}")]
    GenerationExhausted {
        task: &'static str,
        attempts: u32,
        summary: String,
    },

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Render not found: {0}")]
    RenderNotFound(String),

    #[error("Project {project} already has render {render} in progress")]
    RenderInProgress { project: String, render: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Render failed: {0}")]
    RenderFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    Store(#[from] reel_store::StoreError),

    #[error("Media error: {0}")]
    Media(#[from] reel_media::MediaError),

    #[error("Inference error: {0}")]
    Ml(#[from] reel_ml_client::MlError),

    #[error("Schedule error: {0}")]
    Compositor(#[from] reel_compositor::CompositorError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn render_failed(msg: impl Into<String>) -> Self {
        Self::RenderFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether the error came from a generative or inference service.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            PipelineError::GenerationExhausted { .. } | PipelineError::Ml(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            PipelineError::AssetNotFound(_) | PipelineError::RenderNotFound(_) => true,
            PipelineError::Store(e) => e.is_not_found(),
            _ => false,
        }
    }
}
