//! Service seams used by the pipeline.

use async_trait::async_trait;
use reel_models::AudioAnalysis;
use std::path::Path;

use crate::error::MlResult;

/// Generative text service: prompt in, raw text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> MlResult<String>;
}

/// Vision/language service: image plus instruction in, raw text out.
#[async_trait]
pub trait VisionTagger: Send + Sync {
    async fn describe_image(&self, image: &Path, instruction: &str) -> MlResult<String>;
}

/// Voice-track transcription and emotion analysis.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> MlResult<AudioAnalysis>;
}
