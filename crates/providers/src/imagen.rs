//! Adapter for the synchronous single-shot image provider.
//!
//! The native Imagen models take prompt, sample count, and aspect
//! ratio in one `:predict` call and answer with base64 image bytes.
//! This is the only provider that honours the requested image count
//! upstream; the credit charge stays flat per call regardless.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use crate::gemini::GeminiConfig;
use crate::types::{ProviderError, ProviderImage, ProviderOutput, ProviderRequest};

/// HTTP adapter for the single-shot provider. Shares endpoint
/// configuration with the multi-turn adapter -- same API surface,
/// different call shape.
pub struct ImagenAdapter {
    http: reqwest::Client,
    config: GeminiConfig,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(rename = "bytesBase64Encoded")]
    bytes_base64: Option<String>,
}

impl ImagenAdapter {
    pub fn new(http: reqwest::Client, config: GeminiConfig) -> Self {
        Self { http, config }
    }

    pub async fn generate(
        &self,
        request: &ProviderRequest,
    ) -> Result<ProviderOutput, ProviderError> {
        let response = self
            .http
            .post(format!(
                "{}/models/{}:predict",
                self.config.api_base, request.model.id
            ))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&json!({
                "instances": [{ "prompt": request.prompt }],
                "parameters": {
                    "sampleCount": request.image_count,
                    "aspectRatio": request.aspect_ratio,
                },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Generation(format!(
                "Imagen API error: {} - {body}",
                status.as_u16()
            )));
        }

        let body: PredictResponse = response.json().await?;
        let mut images = Vec::with_capacity(body.predictions.len());
        for prediction in body.predictions {
            let Some(encoded) = prediction.bytes_base64 else {
                continue;
            };
            let bytes = BASE64
                .decode(&encoded)
                .map_err(|e| ProviderError::Decode(format!("invalid prediction bytes: {e}")))?;
            images.push(ProviderImage::Inline(bytes));
        }

        if images.is_empty() {
            return Err(ProviderError::NoImages);
        }
        Ok(ProviderOutput { images })
    }
}
