//! Gemini API連携（REST generateContent）

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use receipt_scan_common::GeminiModel;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ImagePayload, ModelClient};
use crate::config::Config;
use crate::error::{ReceiptScanError, Result};

/// Gemini APIリクエスト
#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    InlineData { inline_data: InlineData<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

/// Gemini APIレスポンス
#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiResponse {
    /// 先頭候補のテキストパートを連結（テキストが無ければ None）
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReceiptScanError::ApiCall(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: crate::config::DEFAULT_API_BASE_URL.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.get_api_key()?, Duration::from_secs(config.timeout_seconds))?
            .with_base_url(config.api_base_url.clone()))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: GeminiModel) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model.id())
    }
}

fn build_request<'a>(image: &'a ImagePayload, prompt: &'a str) -> GeminiRequest<'a> {
    GeminiRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: &image.mime_type,
                        data: image.to_base64(),
                    },
                },
                Part::Text { text: prompt },
            ],
        }],
        generation_config: GenerationConfig {
            temperature: 0.1,
            response_mime_type: "application/json",
        },
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(
        &self,
        model: GeminiModel,
        image: &ImagePayload,
        prompt: &str,
    ) -> Result<Option<String>> {
        let body = build_request(image, prompt);

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReceiptScanError::ApiCall("request to Gemini timed out".into())
                } else {
                    ReceiptScanError::ApiCall(format!("request to Gemini failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ReceiptScanError::ApiCall(format!(
                "Gemini returned {}: {}",
                status, error_body
            )));
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ReceiptScanError::ApiCall(format!("invalid Gemini response: {}", e)))?;

        let text = payload.text();
        debug!(model = %model, has_text = text.is_some(), "Gemini response received");
        Ok(text)
    }
}
