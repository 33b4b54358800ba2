//! Object storage client for generated images.
//!
//! Uploads land in a single bucket under `{user_id}/{job_id}...` paths
//! (see `artio_core::generation::artifact_path`). Signed URLs are used
//! to hand provider-visible references to image inputs that live in
//! caller storage.

use async_trait::async_trait;

use crate::backend::{Backend, StoreError};

/// Durable image storage operations.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload bytes to `path`, overwriting any existing object.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), StoreError>;

    /// Delete the object at `path`.
    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    /// Create a time-limited signed URL for `path`.
    async fn signed_url(&self, path: &str, expires_in_secs: u32) -> Result<String, StoreError>;

    /// Best-effort public URL for `path`. Never fails; only correct if
    /// the bucket is publicly readable.
    fn public_url(&self, path: &str) -> String;
}

/// Fetches image bytes from an arbitrary URL (provider-hosted results,
/// or signed caller inputs).
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StoreError>;
}

/// [`ImageStore`] over the backend's storage HTTP API.
pub struct HttpImageStore {
    backend: Backend,
    bucket: String,
}

impl HttpImageStore {
    pub fn new(backend: Backend, bucket: String) -> Self {
        Self { backend, bucket }
    }
}

#[derive(serde::Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let response = self
            .backend
            .request(
                reqwest::Method::POST,
                &format!("/storage/v1/object/{}/{}", self.bucket, path),
            )
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;

        Backend::ensure_success(response).await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        let response = self
            .backend
            .request(
                reqwest::Method::DELETE,
                &format!("/storage/v1/object/{}/{}", self.bucket, path),
            )
            .send()
            .await?;

        Backend::ensure_success(response).await?;
        Ok(())
    }

    async fn signed_url(&self, path: &str, expires_in_secs: u32) -> Result<String, StoreError> {
        let response = self
            .backend
            .request(
                reqwest::Method::POST,
                &format!("/storage/v1/object/sign/{}/{}", self.bucket, path),
            )
            .json(&serde_json::json!({ "expiresIn": expires_in_secs }))
            .send()
            .await?;

        let response = Backend::ensure_success(response).await?;
        let signed: SignResponse = Backend::decode(response).await?;
        // The API returns a path relative to /storage/v1.
        Ok(format!(
            "{}/storage/v1{}",
            self.backend.base_url(),
            signed.signed_url
        ))
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.backend.base_url(),
            self.bucket,
            path
        )
    }
}

/// [`ImageFetcher`] over a plain [`reqwest::Client`].
pub struct HttpImageFetcher {
    http: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StoreError> {
        let response = self.http.get(url).send().await?;
        let response = Backend::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
