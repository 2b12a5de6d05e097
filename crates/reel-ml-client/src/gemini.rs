//! Gemini `generateContent` client.
//!
//! Used both as the generative text service (planning, schedule compile,
//! trend research) and as the vision service (frame tagging).

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::MlClientConfig;
use crate::error::{MlError, MlResult};
use crate::provider::{TextGenerator, VisionTagger};

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    text_models: Vec<String>,
    vision_model: String,
}

impl GeminiClient {
    pub fn new(config: &MlClientConfig) -> MlResult<Self> {
        let api_key = config
            .gemini_api_key
            .clone()
            .ok_or_else(|| MlError::NotConfigured("GEMINI_API_KEY not set".to_string()))?;
        if config.text_models.is_empty() {
            return Err(MlError::NotConfigured("no text models configured".to_string()));
        }

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.gemini_base_url.clone(),
            text_models: config.text_models.clone(),
            vision_model: config.vision_model.clone(),
        })
    }

    async fn call(&self, model: &str, request: &GenerateRequest) -> MlResult<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MlError::RequestFailed { status, body });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| MlError::invalid_response(format!("undecodable Gemini response: {e}")))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(MlError::invalid_response("no text in Gemini response"));
        }
        debug!(model, chars = text.len(), "Gemini responded");
        Ok(text)
    }
}

fn image_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    /// Try each configured model in order and return the first answer.
    async fn generate(&self, prompt: &str) -> MlResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::Text {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: 0.7,
            }),
        };

        let mut last_error = None;
        for model in &self.text_models {
            match self.call(model, &request).await {
                Ok(text) => {
                    info!("Generated text with {}", model);
                    return Ok(text);
                }
                Err(e) => {
                    warn!("Model {} failed: {}", model, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| MlError::NotConfigured("no text models".to_string())))
    }
}

#[async_trait]
impl VisionTagger for GeminiClient {
    async fn describe_image(&self, image: &Path, instruction: &str) -> MlResult<String> {
        let bytes = tokio::fs::read(image).await?;
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: instruction.to_string(),
                    },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: image_mime_type(image).to_string(),
                            data: BASE64.encode(&bytes),
                        },
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: 0.2,
            }),
        };
        self.call(&self.vision_model, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str, models: &[&str]) -> MlClientConfig {
        MlClientConfig {
            gemini_api_key: Some("test-key".to_string()),
            gemini_base_url: base_url.to_string(),
            text_models: models.iter().map(|m| m.to_string()).collect(),
            vision_model: "vision-model".to_string(),
            ..MlClientConfig::default()
        }
    }

    fn answer(text: &str) -> serde_json::Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    #[tokio::test]
    async fn test_generate_returns_first_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/primary:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer("{\"segments\": []}")))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config(&server.uri(), &["primary"])).unwrap();
        let text = client.generate("plan this").await.unwrap();
        assert_eq!(text, "{\"segments\": []}");
    }

    #[tokio::test]
    async fn test_generate_falls_back_to_next_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/primary:generateContent"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/backup:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer("ok")))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config(&server.uri(), &["primary", "backup"])).unwrap();
        assert_eq!(client.generate("hi").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_generate_surfaces_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config(&server.uri(), &["only"])).unwrap();
        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, MlError::RequestFailed { status: 500, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_describe_image_sends_inline_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let frame = dir.path().join("frame.jpg");
        tokio::fs::write(&frame, b"jpegbytes").await.unwrap();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/vision-model:generateContent"))
            .and(body_partial_json(json!({
                "contents": [{"parts": [
                    {"text": "describe"},
                    {"inlineData": {"mimeType": "image/jpeg", "data": BASE64.encode(b"jpegbytes")}}
                ]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer("{\"description\": \"x\"}")))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config(&server.uri(), &["primary"])).unwrap();
        let text = client.describe_image(&frame, "describe").await.unwrap();
        assert!(text.contains("description"));
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let err = GeminiClient::new(&MlClientConfig::default()).err().unwrap();
        assert!(matches!(err, MlError::NotConfigured(_)));
        assert!(!err.is_transient());
    }
}
