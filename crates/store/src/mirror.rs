//! Result mirror: copy generated images into our own storage.
//!
//! Providers hand back either hosted URLs or inline bytes; neither is
//! durable from our point of view, so every artifact is mirrored into
//! the generated-images bucket before the job is marked completed.
//!
//! Atomicity policy: items are mirrored strictly in order, and if any
//! item fails after earlier ones succeeded, the already-stored objects
//! are deleted (best effort) before the original error propagates. A
//! job must never reference a partial result set.

use std::sync::Arc;

use artio_core::generation::{artifact_path, OutputFormat};
use artio_core::types::{JobId, UserId};

use crate::backend::StoreError;
use crate::storage::{ImageFetcher, ImageStore};

/// One provider artifact awaiting mirroring.
#[derive(Debug, Clone)]
pub enum MirrorSource {
    /// Provider-hosted image to download first.
    Url(String),
    /// Already-decoded image bytes.
    Bytes(Vec<u8>),
}

/// Mirrors provider outputs into durable storage.
pub struct ResultMirror {
    store: Arc<dyn ImageStore>,
    fetcher: Arc<dyn ImageFetcher>,
}

impl ResultMirror {
    pub fn new(store: Arc<dyn ImageStore>, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self { store, fetcher }
    }

    /// The underlying store, for signed-URL exchange on image inputs.
    pub fn store(&self) -> &Arc<dyn ImageStore> {
        &self.store
    }

    /// Mirror `sources` in order and return the stored paths, one per
    /// input. Any failure rolls back the objects stored so far.
    pub async fn mirror(
        &self,
        user_id: UserId,
        job_id: JobId,
        sources: Vec<MirrorSource>,
        format: OutputFormat,
    ) -> Result<Vec<String>, StoreError> {
        let mut stored: Vec<String> = Vec::with_capacity(sources.len());

        for (index, source) in sources.into_iter().enumerate() {
            let result = self
                .mirror_one(user_id, job_id, index, source, format)
                .await;

            match result {
                Ok(path) => stored.push(path),
                Err(e) => {
                    self.rollback(&stored).await;
                    return Err(e);
                }
            }
        }

        Ok(stored)
    }

    async fn mirror_one(
        &self,
        user_id: UserId,
        job_id: JobId,
        index: usize,
        source: MirrorSource,
        format: OutputFormat,
    ) -> Result<String, StoreError> {
        let bytes = match source {
            MirrorSource::Url(url) => self.fetcher.fetch(&url).await?,
            MirrorSource::Bytes(bytes) => bytes,
        };

        let path = artifact_path(user_id, job_id, index, format);
        self.store
            .upload(&path, bytes, format.content_type())
            .await?;
        Ok(path)
    }

    /// Delete already-stored objects after a mid-mirror failure.
    /// Cleanup failures are logged, never raised: the original error is
    /// what the caller needs to see.
    async fn rollback(&self, stored: &[String]) {
        for path in stored {
            if let Err(e) = self.store.remove(path).await {
                tracing::warn!(path = %path, error = %e, "Failed to clean up partial mirror result");
            }
        }
    }
}
