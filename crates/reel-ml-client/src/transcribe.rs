//! Transcription service client.

use async_trait::async_trait;
use reel_models::AudioAnalysis;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use tracing::info;

use crate::config::MlClientConfig;
use crate::contract::TaskContract;
use crate::error::{MlError, MlResult};
use crate::extract::extract_validated_json;
use crate::provider::Transcriber;

/// Uploads a voice track and reads back `{text, durationSeconds,
/// emotionTimeline, cueWords}`.
#[derive(Clone)]
pub struct TranscriptionClient {
    client: Client,
    base_url: String,
}

impl TranscriptionClient {
    pub fn new(config: &MlClientConfig) -> MlResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.transcribe_url.clone(),
        })
    }
}

fn audio_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        Some("webm") => "audio/webm",
        _ => "audio/mpeg",
    }
}

#[async_trait]
impl Transcriber for TranscriptionClient {
    async fn transcribe(&self, audio: &Path) -> MlResult<AudioAnalysis> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        info!("Transcribing {} ({} bytes)", file_name, bytes.len());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(audio_mime_type(audio))?;
        let form = Form::new().part("audio", part);

        let response = self
            .client
            .post(format!("{}/transcribe", self.base_url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MlError::RequestFailed { status, body });
        }

        let body = response.text().await?;
        let value = extract_validated_json(&body, TaskContract::AudioAnalysis)?;
        let analysis: AudioAnalysis = serde_json::from_value(value)?;

        if analysis.text.trim().is_empty() {
            return Err(MlError::invalid_response("transcription contained no text"));
        }
        Ok(analysis)
    }
}
