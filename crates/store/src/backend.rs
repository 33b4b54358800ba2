//! Shared connection handle and error type for backend HTTP clients.

use serde::de::DeserializeOwned;

/// Errors from the backend HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response decoded, but not into the shape we expected.
    #[error("Unexpected response shape: {0}")]
    Decode(String),
}

/// Connection handle for one backend project.
///
/// Cheap to clone; every per-concern client (`HttpJobStore`,
/// `HttpCreditLedger`, ...) wraps one of these so they share a
/// connection pool.
#[derive(Clone)]
pub struct Backend {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl Backend {
    /// Create a handle for the backend at `base_url`, authenticating
    /// every call with the given service role key.
    pub fn new(base_url: String, service_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        }
    }

    /// Create a handle reusing an existing [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client, base_url: String, service_key: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The service role key (for calls that authenticate with a user
    /// token but still need the project key header).
    pub fn service_key(&self) -> &str {
        &self.service_key
    }

    /// Start a request against a backend path, with the service role
    /// key attached as both `apikey` and bearer token.
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// Cheap reachability probe against the REST root.
    pub async fn health_check(&self) -> Result<(), StoreError> {
        let response = self.request(reqwest::Method::GET, "/rest/v1/").send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Call a remote procedure under `/rest/v1/rpc/` and decode the
    /// JSON result.
    pub async fn rpc<T: DeserializeOwned>(
        &self,
        name: &str,
        args: &serde_json::Value,
    ) -> Result<T, StoreError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/rest/v1/rpc/{name}"))
            .json(args)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Self::decode(response).await
    }

    /// Decode a JSON response body, reporting a body that does not
    /// match the expected shape as [`StoreError::Decode`] rather than
    /// a transport error.
    pub async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`StoreError::Api`] with the
    /// status and body text on failure.
    pub async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
