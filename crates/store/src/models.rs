//! Row types for the remote job store.

use artio_core::types::{JobId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a generation job.
///
/// Jobs are created as `pending` by the client-facing API, moved to
/// `processing` when the orchestrator picks them up, and end in exactly
/// one of `completed` or `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One row of the `generation_jobs` table, as read over the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationJob {
    pub id: JobId,
    /// Owning identity; set at creation and immutable.
    pub user_id: UserId,
    pub status: JobStatus,
    /// External task handle, set once the async provider accepts the task.
    pub provider_task_id: Option<String>,
    /// Durable storage paths, set only on success.
    #[serde(default)]
    pub result_urls: Option<Vec<String>>,
    /// Failure cause, set only on failure. May carry the manual
    /// intervention marker when a refund exhausted its retries.
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Partial update applied to a job row.
///
/// `None` fields are omitted from the PATCH body entirely; `Some(None)`
/// on the nullable columns writes an explicit SQL NULL.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_task_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobUpdate {
    /// Update marking the start of processing. Clears any stale task
    /// handle from a previous attempt.
    pub fn processing() -> Self {
        Self {
            status: Some(JobStatus::Processing),
            provider_task_id: Some(None),
            ..Default::default()
        }
    }

    /// Terminal failure with a stored error message.
    pub fn failed(error_message: String) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error_message: Some(error_message),
            ..Default::default()
        }
    }

    /// Terminal success with the mirrored storage paths.
    pub fn completed(result_urls: Vec<String>) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            result_urls: Some(result_urls),
            completed_at: Some(Utc::now()),
            ..Default::default()
        }
    }
}
