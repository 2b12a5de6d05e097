//! Inference client configuration.

use std::time::Duration;

/// Endpoints and credentials for the inference services.
#[derive(Debug, Clone)]
pub struct MlClientConfig {
    /// API key for the generative service (`GEMINI_API_KEY`)
    pub gemini_api_key: Option<String>,
    /// Base URL up to and including the API version
    pub gemini_base_url: String,
    /// Models tried in order for text generation
    pub text_models: Vec<String>,
    /// Model used for frame tagging
    pub vision_model: String,
    /// Base URL of the transcription service
    pub transcribe_url: String,
    pub request_timeout: Duration,
}

impl Default for MlClientConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            text_models: vec!["gemini-2.5-flash".to_string(), "gemini-2.5-flash-lite".to_string()],
            vision_model: "gemini-2.5-flash".to_string(),
            transcribe_url: "http://127.0.0.1:5001".to_string(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl MlClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            gemini_base_url: std::env::var("GEMINI_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gemini_base_url),
            text_models: std::env::var("GEMINI_TEXT_MODELS")
                .map(|s| {
                    s.split(',')
                        .map(|m| m.trim().to_string())
                        .filter(|m| !m.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.text_models),
            vision_model: std::env::var("GEMINI_VISION_MODEL").unwrap_or(defaults.vision_model),
            transcribe_url: std::env::var("TRANSCRIBE_SERVICE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.transcribe_url),
            request_timeout: Duration::from_secs(
                std::env::var("ML_REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        }
    }
}
