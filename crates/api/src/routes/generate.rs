//! The `/generate` endpoint: run a pending job through the generation
//! state machine.

use artio_core::types::JobId;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppJson, AppResult};
use crate::generation::GenerateParams;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Request body for `POST /api/v1/generate`.
///
/// The job row must already exist in `pending` state; this call claims
/// and executes it. The authenticated user comes from the Bearer token,
/// never from the body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub job_id: JobId,
    pub prompt: String,
    /// Catalog model id; the default model is used when omitted.
    pub model: Option<String>,
    pub aspect_ratio: Option<String>,
    pub image_count: Option<u32>,
    /// `"png"` or `"jpg"`; anything else normalizes to jpg.
    pub output_format: Option<String>,
    /// Image inputs for edit-capable models: absolute URLs or
    /// storage-relative paths (exchanged for signed URLs).
    pub image_inputs: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub job_id: JobId,
    /// Durable storage paths of the mirrored results, in order.
    pub storage_paths: Vec<String>,
}

pub async fn generate(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(request): AppJson<GenerateRequest>,
) -> AppResult<Json<GenerateResponse>> {
    let job_id = request.job_id;
    tracing::info!(
        %job_id,
        user_id = %user.user_id,
        model = request.model.as_deref().unwrap_or("default"),
        "Generation requested"
    );

    let params = GenerateParams {
        job_id,
        prompt: request.prompt,
        model: request.model,
        aspect_ratio: request.aspect_ratio,
        image_count: request.image_count,
        output_format: request.output_format,
        image_inputs: request.image_inputs.unwrap_or_default(),
    };

    let storage_paths = state.orchestrator.execute(user.user_id, params).await?;

    Ok(Json(GenerateResponse {
        success: true,
        job_id,
        storage_paths,
    }))
}
