//! Remote job store client.

use artio_core::types::JobId;
use async_trait::async_trait;

use crate::backend::{Backend, StoreError};
use crate::models::{GenerationJob, JobUpdate};

/// Read/mutate access to generation job rows.
///
/// The backing store enforces at most one winner for concurrent status
/// transitions on the same row; this trait only exposes the calls.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Load a job by id. `Ok(None)` means the row does not exist.
    async fn fetch(&self, job_id: JobId) -> Result<Option<GenerationJob>, StoreError>;

    /// Apply a partial update to a job row.
    async fn update(&self, job_id: JobId, update: JobUpdate) -> Result<(), StoreError>;
}

/// [`JobStore`] over the backend's row-level REST API.
pub struct HttpJobStore {
    backend: Backend,
}

impl HttpJobStore {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl JobStore for HttpJobStore {
    async fn fetch(&self, job_id: JobId) -> Result<Option<GenerationJob>, StoreError> {
        let response = self
            .backend
            .request(
                reqwest::Method::GET,
                &format!("/rest/v1/generation_jobs?id=eq.{job_id}&select=*"),
            )
            .send()
            .await?;

        let response = Backend::ensure_success(response).await?;
        // Row filters return a JSON array; zero rows means not found.
        let mut rows: Vec<GenerationJob> = Backend::decode(response).await?;
        Ok(rows.pop())
    }

    async fn update(&self, job_id: JobId, update: JobUpdate) -> Result<(), StoreError> {
        let response = self
            .backend
            .request(
                reqwest::Method::PATCH,
                &format!("/rest/v1/generation_jobs?id=eq.{job_id}"),
            )
            .header("Prefer", "return=minimal")
            .json(&update)
            .send()
            .await?;

        Backend::ensure_success(response).await?;
        Ok(())
    }
}
