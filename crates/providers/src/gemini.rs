//! Adapter for the synchronous multi-turn image provider.
//!
//! One `generateContent` call carries the whole conversation: any
//! image inputs are downloaded and inlined as base64 `inline_data`
//! parts, followed by the text prompt. The response returns generated
//! images the same way, as inline base64 parts.

use std::sync::Arc;

use artio_store::ImageFetcher;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

use crate::types::{ProviderError, ProviderImage, ProviderOutput, ProviderRequest};

/// Shared configuration for both synchronous adapters.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Base URL, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub api_base: String,
    pub api_key: String,
}

/// HTTP adapter for the multi-turn provider.
pub struct GeminiAdapter {
    http: reqwest::Client,
    config: GeminiConfig,
    fetcher: Arc<dyn ImageFetcher>,
}

impl GeminiAdapter {
    pub fn new(http: reqwest::Client, config: GeminiConfig, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            http,
            config,
            fetcher,
        }
    }

    pub async fn generate(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderOutput, ProviderError> {
        let parts = self.build_parts(request).await?;

        let response = self
            .http
            .post(format!(
                "{}/models/{}:generateContent",
                self.config.api_base, request.model.id
            ))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&json!({
                "contents": [{ "parts": parts }],
                "generationConfig": {
                    "imageConfig": { "aspectRatio": request.aspect_ratio },
                },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Generation(format!(
                "Gemini API error: {} - {body}",
                status.as_u16()
            )));
        }

        let body: Value = response.json().await?;
        let images = extract_inline_images(&body)?;
        if images.is_empty() {
            return Err(ProviderError::NoImages);
        }
        Ok(ProviderOutput { images })
    }

    /// Ordered conversation parts: image inputs first (downloaded and
    /// inlined), then the text prompt.
    async fn build_parts(&self, request: &ProviderRequest) -> Result<Vec<Value>, ProviderError> {
        let mut parts = Vec::with_capacity(request.image_inputs.len() + 1);

        for url in &request.image_inputs {
            let bytes = self
                .fetcher
                .fetch(url)
                .await
                .map_err(|e| ProviderError::Generation(format!("Failed to load image input: {e}")))?;
            parts.push(json!({
                "inline_data": {
                    "mime_type": mime_for_url(url),
                    "data": BASE64.encode(&bytes),
                }
            }));
        }

        parts.push(json!({ "text": request.prompt }));
        Ok(parts)
    }
}

/// Collect every inline image across all candidates, decoded to bytes.
fn extract_inline_images(body: &Value) -> Result<Vec<ProviderImage>, ProviderError> {
    let mut images = Vec::new();

    let candidates = body["candidates"].as_array().cloned().unwrap_or_default();
    for candidate in &candidates {
        let parts = candidate["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        for part in &parts {
            if let Some(data) = part["inlineData"]["data"].as_str() {
                let bytes = BASE64
                    .decode(data)
                    .map_err(|e| ProviderError::Decode(format!("invalid inline image: {e}")))?;
                images.push(ProviderImage::Inline(bytes));
            }
        }
    }

    Ok(images)
}

/// Guess a MIME type from the URL's extension; the provider only needs
/// a rough hint.
fn mime_for_url(url: &str) -> &'static str {
    let path = url.split('?').next().unwrap_or(url);
    if path.ends_with(".png") {
        "image/png"
    } else if path.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}
