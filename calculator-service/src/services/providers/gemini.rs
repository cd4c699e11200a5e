//! Gemini drawing interpreter.
//!
//! Sends the rubric prompt plus the drawing as inline PNG data to the
//! `generateContent` endpoint and decodes the first candidate's text.

use super::prompt::{DRAWING_MIME_TYPE, DRAWING_PROMPT};
use super::{DrawingInterpreter, InferenceError};
use crate::config::{GeminiSettings, GenerationSettings};
use crate::models::MathResult;
use crate::services::reply_parser::parse_results;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Header carrying the API key. Keeps the key out of URLs, and therefore out
/// of reqwest error messages.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini-backed [`DrawingInterpreter`].
pub struct GeminiClient {
    settings: GeminiSettings,
    api_key: Secret<String>,
    client: Client,
    closed: AtomicBool,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.settings.model)
            .field("api_base_url", &self.settings.api_base_url)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl GeminiClient {
    /// Build the client. Fails when no API key is configured.
    pub fn new(settings: GeminiSettings) -> Result<Self, InferenceError> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            InferenceError::Configuration(
                "GEMINI_API_KEY environment variable not set".to_string(),
            )
        })?;

        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| {
                InferenceError::Configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            settings,
            api_key,
            client,
            closed: AtomicBool::new(false),
        })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.api_base_url, self.settings.model
        )
    }

    async fn generate(&self, image: &[u8]) -> Result<String, InferenceError> {
        let request = build_request(image, &self.settings.generation);

        let response = self
            .client
            .post(self.api_url())
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;

        reply_text(api_response)
    }

    fn transport_error(&self, err: reqwest::Error) -> InferenceError {
        if err.is_timeout() {
            InferenceError::Timeout(self.settings.timeout)
        } else {
            InferenceError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl DrawingInterpreter for GeminiClient {
    async fn process_drawing(&self, image: &[u8]) -> Result<Vec<MathResult>, InferenceError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(InferenceError::Closed);
        }

        tracing::debug!(
            model = %self.settings.model,
            image_bytes = image.len(),
            "Sending drawing to Gemini API"
        );

        let text = self.generate(image).await?;
        tracing::info!(model = %self.settings.model, response = %text, "Gemini response");

        Ok(parse_results(&text)?)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(model = %self.settings.model, "Gemini client closed");
        }
    }
}

fn build_request(image: &[u8], generation: &GenerationSettings) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![
                ContentPart::Text {
                    text: DRAWING_PROMPT.to_string(),
                },
                ContentPart::InlineData {
                    inline_data: InlineData {
                        mime_type: DRAWING_MIME_TYPE.to_string(),
                        data: STANDARD.encode(image),
                    },
                },
            ],
        }],
        generation_config: GenerationConfig {
            temperature: generation.temperature,
            top_k: generation.top_k,
            top_p: generation.top_p,
            max_output_tokens: generation.max_output_tokens,
        },
    }
}

/// Text of the first part of the first candidate. A first part without text
/// yields an empty string, which then fails JSON decoding.
fn reply_text(response: GenerateContentResponse) -> Result<String, InferenceError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(InferenceError::NoResponse)?;

    let finish_reason = candidate.finish_reason;
    let part = candidate
        .content
        .and_then(|content| content.parts.into_iter().next())
        .ok_or_else(|| {
            tracing::warn!(finish_reason = ?finish_reason, "Gemini candidate has no content parts");
            InferenceError::NoResponse
        })?;

    Ok(match part {
        ContentPart::Text { text } => text,
        _ => String::new(),
    })
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    /// Function calls and other part kinds this service never asks for.
    #[serde(skip_serializing)]
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_settings() -> GeminiSettings {
        GeminiSettings::new(Some(Secret::new("test-api-key".to_string())))
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let err = GeminiClient::new(GeminiSettings::new(None)).unwrap_err();
        assert!(matches!(err, InferenceError::Configuration(_)));
        assert_eq!(err.to_string(), "GEMINI_API_KEY environment variable not set");
    }

    #[test]
    fn api_url_targets_generate_content() {
        let client = GeminiClient::new(test_settings()).unwrap();
        assert_eq!(
            client.api_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn debug_output_does_not_leak_the_key() {
        let client = GeminiClient::new(test_settings()).unwrap();
        assert!(!format!("{:?}", client).contains("test-api-key"));
    }

    #[test]
    fn request_carries_prompt_image_and_generation_config() {
        let request = build_request(b"\x89PNG", &GenerationSettings::default());
        let body = serde_json::to_value(&request).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(parts[0]["text"], DRAWING_PROMPT);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], STANDARD.encode(b"\x89PNG"));

        let config = &body["generationConfig"];
        assert_eq!(config["temperature"], json!(1.0));
        assert_eq!(config["topK"], json!(64));
        assert_eq!(config["topP"].as_f64().map(|p| (p * 100.0).round()), Some(95.0));
        assert_eq!(config["maxOutputTokens"], json!(8192));
    }

    #[test]
    fn reply_text_reads_first_part() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "[]"}, {"text": "ignored"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(reply_text(response).unwrap(), "[]");
    }

    #[test]
    fn no_candidates_means_no_response() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(matches!(reply_text(response), Err(InferenceError::NoResponse)));

        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(reply_text(response), Err(InferenceError::NoResponse)));
    }

    #[test]
    fn candidate_without_parts_means_no_response() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"role": "model", "parts": []}}]
        }))
        .unwrap();
        let err = reply_text(response).unwrap_err();
        assert_eq!(err.to_string(), "no response from model");

        let response: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "SAFETY"}]})).unwrap();
        assert!(matches!(reply_text(response), Err(InferenceError::NoResponse)));
    }

    #[test]
    fn non_text_first_part_yields_empty_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"functionCall": {"name": "f"}}]}}]
        }))
        .unwrap();
        assert_eq!(reply_text(response).unwrap(), "");
    }

    #[tokio::test]
    async fn closed_client_rejects_calls() {
        let client = GeminiClient::new(test_settings()).unwrap();
        client.close();
        client.close();

        let err = client.process_drawing(b"png").await.unwrap_err();
        assert!(matches!(err, InferenceError::Closed));
    }
}
