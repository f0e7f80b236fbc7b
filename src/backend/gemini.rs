//! Backend for the Google Gemini REST API.
//!
//! Endpoint: `POST {base}/v1beta/models/{model}:generateContent`.
//! Auth: `x-goog-api-key: {key}`.
//! Images travel as base64 `inlineData` parts in both directions.

use super::{GenerateRequest, GenerateResponse, GenerationBackend, Part, ResponsePart};
use crate::error::Result;
use crate::StoryError;
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Backend for Gemini `generateContent`.
///
/// # Example
///
/// ```
/// use storybook_pipeline::backend::GeminiBackend;
///
/// let backend = GeminiBackend::new(reqwest::Client::new(), "AIza-test-key");
/// ```
#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: String = self.api_key.chars().take(4).collect();
        f.debug_struct("GeminiBackend")
            .field("base_url", &self.base_url)
            .field("api_key", &format!("{}***", prefix))
            .finish()
    }
}

impl GeminiBackend {
    /// Create a backend against the public Gemini host.
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Override the API host (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    /// Build the request body for `generateContent`.
    fn build_body(request: &GenerateRequest) -> Value {
        let engine = base64::engine::general_purpose::STANDARD;
        let parts: Vec<Value> = request
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => json!({ "text": text }),
                Part::InlineData { mime_type, data } => json!({
                    "inlineData": {
                        "mimeType": mime_type,
                        "data": engine.encode(data),
                    }
                }),
            })
            .collect();

        let mut body = json!({
            "contents": [{ "parts": parts }],
        });

        if !request.response_modalities.is_empty() {
            let modalities: Vec<&str> = request
                .response_modalities
                .iter()
                .map(|m| m.as_str())
                .collect();
            body["generationConfig"] = json!({ "responseModalities": modalities });
        }

        body
    }

    /// Parse a `Retry-After` header value as seconds.
    fn parse_retry_after(value: &str) -> Option<std::time::Duration> {
        value
            .trim()
            .parse::<u64>()
            .ok()
            .map(std::time::Duration::from_secs)
    }

    /// Extract the first candidate's parts, decoding inline payloads.
    ///
    /// Inline payloads that are not valid base64 are dropped.
    fn parse_response(json_resp: &Value) -> GenerateResponse {
        let engine = base64::engine::general_purpose::STANDARD;
        let parts = json_resp
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| {
                        let inline = part.get("inlineData").or_else(|| part.get("inline_data"));
                        if let Some(inline) = inline {
                            let data = inline.get("data").and_then(|d| d.as_str())?;
                            let mime_type = inline
                                .get("mimeType")
                                .or_else(|| inline.get("mime_type"))
                                .and_then(|m| m.as_str())
                                .map(str::to_string);
                            return match engine.decode(data) {
                                Ok(data) => Some(ResponsePart::InlineData { mime_type, data }),
                                Err(e) => {
                                    debug!(error = %e, "dropping undecodable inline payload");
                                    None
                                }
                            };
                        }
                        part.get("text")
                            .and_then(|t| t.as_str())
                            .map(|t| ResponsePart::Text(t.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        GenerateResponse { parts }
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = self.endpoint(&request.model);
        let body = Self::build_body(request);

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                StoryError::Other(format!("Failed to connect to Gemini at {}: {}", url, e))
            })?;

        let status = resp.status().as_u16();

        if !resp.status().is_success() {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(Self::parse_retry_after);
            let text = resp.text().await.unwrap_or_default();
            return Err(StoryError::HttpError {
                status,
                body: text,
                retry_after,
            });
        }

        let json_resp: Value = resp.json().await?;
        Ok(Self::parse_response(&json_resp))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
