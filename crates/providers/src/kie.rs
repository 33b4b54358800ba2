//! Adapter for the asynchronous task-based provider.
//!
//! Generation is a two-step dance: `createTask` submits a
//! model-specific input payload and returns a task handle, then the
//! task is polled at a fixed interval until it reaches a terminal
//! state or the wall-clock deadline expires.
//!
//! The per-family input mapping implemented by [`build_task_input`] is
//! part of the provider contract -- a wrong field name silently breaks
//! generation for a whole model family, which is why it is a closed
//! `match` over [`KieFamily`] with its own tests.

use std::time::Duration;

use artio_core::catalog::{remap_gpt_aspect_ratio, KieFamily};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::types::{ProviderError, ProviderRequest};

/// Tunables for the task-based provider.
#[derive(Debug, Clone)]
pub struct KieConfig {
    /// Base URL, e.g. `https://api.kie.ai`.
    pub api_base: String,
    pub api_key: String,
    /// Delay between poll attempts.
    pub poll_interval: Duration,
    /// Overall wall-clock budget for polling one task.
    pub poll_deadline: Duration,
    /// Timeout for each individual poll request, independent of the
    /// overall budget.
    pub attempt_timeout: Duration,
}

impl Default for KieConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.kie.ai".to_string(),
            api_key: String::new(),
            poll_interval: Duration::from_secs(2),
            poll_deadline: Duration::from_secs(120),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP adapter for the task-based provider.
pub struct KieAdapter {
    http: reqwest::Client,
    config: KieConfig,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Envelope wrapping every response: `code` 200 means success at the
/// application level regardless of HTTP status.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i32,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct CreateTaskData {
    #[serde(rename = "taskId")]
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct TaskDetailData {
    status: String,
    #[serde(default)]
    output: Option<TaskOutput>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskOutput {
    #[serde(default)]
    images: Option<Vec<String>>,
    #[serde(default)]
    image_url: Option<String>,
}

/// What one successful poll attempt tells us.
enum PollVerdict {
    StillRunning,
    Completed(Vec<String>),
    Failed(String),
}

// ---------------------------------------------------------------------------
// Per-family input payloads
// ---------------------------------------------------------------------------

/// Build the model-specific `input` payload for `createTask`.
///
/// Contract table (field names and fixed tiers per family):
///
/// | family          | image inputs                    | fixed params          |
/// |-----------------|---------------------------------|-----------------------|
/// | Imagen          | none                            | --                     |
/// | NanoBananaEdit  | `image_input`, required         | `output_format: png`  |
/// | NanoBananaPro   | `image_input`, optional         | `resolution: 1k`      |
/// | Flux2           | `input_image`, i2i variant only | `resolution: 1k`      |
/// | GptImage        | `image_input`, i2i variant only | `quality: medium`, aspect ratio remapped to `{1:1, 2:3, 3:2}` |
/// | Seedream        | `image_urls`, edit variant only | `quality: standard`   |
///
/// No family takes an image-count parameter; the charge is flat per
/// call and the task always yields the family's native batch size.
pub fn build_task_input(
    family: KieFamily,
    model_id: &str,
    prompt: &str,
    aspect_ratio: &str,
    image_inputs: &[String],
) -> Result<serde_json::Value, ProviderError> {
    let input = match family {
        KieFamily::Imagen => json!({
            "prompt": prompt,
            "aspect_ratio": aspect_ratio,
        }),

        KieFamily::NanoBananaEdit => {
            if image_inputs.is_empty() {
                return Err(ProviderError::InvalidInput {
                    model: model_id.to_string(),
                    reason: "image inputs are required for the edit model".to_string(),
                });
            }
            json!({
                "prompt": prompt,
                "image_input": image_inputs,
                "output_format": "png",
            })
        }

        KieFamily::NanoBananaPro => {
            let mut input = json!({
                "prompt": prompt,
                "aspect_ratio": aspect_ratio,
                "resolution": "1k",
            });
            if !image_inputs.is_empty() {
                input["image_input"] = json!(image_inputs);
            }
            input
        }

        KieFamily::Flux2 { image_input } => {
            let mut input = json!({
                "prompt": prompt,
                "aspect_ratio": aspect_ratio,
                "resolution": "1k",
            });
            if image_input && !image_inputs.is_empty() {
                input["input_image"] = json!(image_inputs);
            }
            input
        }

        KieFamily::GptImage { image_input } => {
            // This family only accepts a restricted aspect-ratio enum;
            // nearest-equivalent substitution happens silently here.
            let mut input = json!({
                "prompt": prompt,
                "aspect_ratio": remap_gpt_aspect_ratio(aspect_ratio),
                "quality": "medium",
            });
            if image_input && !image_inputs.is_empty() {
                input["image_input"] = json!(image_inputs);
            }
            input
        }

        KieFamily::Seedream { image_input } => {
            let mut input = json!({
                "prompt": prompt,
                "aspect_ratio": aspect_ratio,
                "quality": "standard",
            });
            if image_input && !image_inputs.is_empty() {
                input["image_urls"] = json!(image_inputs);
            }
            input
        }
    };

    Ok(input)
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

impl KieAdapter {
    pub fn new(http: reqwest::Client, config: KieConfig) -> Self {
        Self { http, config }
    }

    /// Submit a task. A non-success envelope code or missing task id is
    /// an error with no retry.
    pub async fn create_task(
        &self,
        request: &ProviderRequest,
        family: KieFamily,
    ) -> Result<String, ProviderError> {
        let input = build_task_input(
            family,
            request.model.id,
            &request.prompt,
            &request.aspect_ratio,
            &request.image_inputs,
        )?;

        let response = self
            .http
            .post(format!("{}/api/v1/jobs/createTask", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&json!({ "model": request.model.id, "input": input }))
            .send()
            .await?;

        let envelope: Envelope<CreateTaskData> = response.json().await?;
        if envelope.code != 200 {
            return Err(ProviderError::TaskCreation(non_empty_or(
                envelope.msg,
                "Failed to create generation task",
            )));
        }
        match envelope.data {
            Some(data) => Ok(data.task_id),
            None => Err(ProviderError::TaskCreation(
                "Task accepted but no task id returned".to_string(),
            )),
        }
    }

    /// Poll a task until it reaches a terminal state.
    ///
    /// Two nested timeout scopes: the overall `poll_deadline` wraps the
    /// whole loop, and each poll request carries its own
    /// `attempt_timeout`. A failed poll attempt (transport error,
    /// malformed body) is swallowed and retried on the next tick; only
    /// provider-reported failure, deadline expiry, or cancellation end
    /// the loop early.
    pub async fn poll_task(
        &self,
        task_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ProviderError> {
        tokio::time::timeout(self.config.poll_deadline, self.poll_loop(task_id, cancel))
            .await
            .unwrap_or(Err(ProviderError::TimedOut))
    }

    async fn poll_loop(
        &self,
        task_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ProviderError> {
        loop {
            match self.poll_once(task_id).await {
                Ok(PollVerdict::Completed(urls)) => {
                    if urls.is_empty() {
                        return Err(ProviderError::NoImages);
                    }
                    return Ok(urls);
                }
                Ok(PollVerdict::Failed(msg)) => return Err(ProviderError::Generation(msg)),
                Ok(PollVerdict::StillRunning) => {}
                Err(e) => {
                    // Transient: a single bad poll must not abort the task.
                    tracing::debug!(task_id, error = %e, "Poll attempt failed, retrying");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    async fn poll_once(&self, task_id: &str) -> Result<PollVerdict, ProviderError> {
        let response = self
            .http
            .get(format!(
                "{}/api/v1/jobs/getTaskDetail?taskId={task_id}",
                self.config.api_base
            ))
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.attempt_timeout)
            .send()
            .await?;

        let envelope: Envelope<TaskDetailData> = response.json().await?;
        if envelope.code != 200 {
            // The provider answered and rejected the task: terminal.
            return Ok(PollVerdict::Failed(non_empty_or(
                envelope.msg,
                "Failed to get task status",
            )));
        }

        let Some(detail) = envelope.data else {
            return Err(ProviderError::Decode("task detail missing".to_string()));
        };

        match detail.status.as_str() {
            "completed" => {
                let mut urls = Vec::new();
                if let Some(output) = detail.output {
                    if let Some(images) = output.images {
                        urls.extend(images);
                    } else if let Some(single) = output.image_url {
                        urls.push(single);
                    }
                }
                Ok(PollVerdict::Completed(urls))
            }
            "failed" => Ok(PollVerdict::Failed(
                detail
                    .error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| "Generation failed".to_string()),
            )),
            _ => Ok(PollVerdict::StillRunning),
        }
    }
}

fn non_empty_or(msg: String, fallback: &str) -> String {
    if msg.is_empty() {
        fallback.to_string()
    } else {
        msg
    }
}
