//! Common request/response shapes shared by every adapter.

use artio_core::catalog::ModelSpec;

/// Generic generation request, already validated and catalog-resolved.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Catalog entry for the requested model (carries the route).
    pub model: ModelSpec,
    pub prompt: String,
    pub aspect_ratio: String,
    /// Requested number of images (1..=4). Only the single-shot
    /// provider honours this upstream; cost is flat per call either way.
    pub image_count: u32,
    /// Absolute URLs of image inputs. Storage-relative references are
    /// exchanged for signed URLs before the request reaches an adapter.
    pub image_inputs: Vec<String>,
}

/// One generated artifact in provider-normalized form.
#[derive(Debug, Clone)]
pub enum ProviderImage {
    /// Hosted by the provider; must be mirrored before it expires.
    Url(String),
    /// Inline bytes, already base64-decoded.
    Inline(Vec<u8>),
}

/// Successful adapter result: a non-empty, ordered list of artifacts.
#[derive(Debug, Clone)]
pub struct ProviderOutput {
    pub images: Vec<ProviderImage>,
}

/// Adapter failures, normalized across providers.
///
/// The `Display` form of each variant is the message callers see, so
/// it carries the provider's proximate cause verbatim where one exists.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP call itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The task-creation endpoint rejected the submission.
    #[error("{0}")]
    TaskCreation(String),

    /// The provider reported the generation as failed.
    #[error("{0}")]
    Generation(String),

    /// The polling deadline elapsed without a terminal task state.
    /// Deliberately distinct from [`ProviderError::Generation`].
    #[error("Task timed out")]
    TimedOut,

    /// The call succeeded but returned zero images.
    #[error("No images generated")]
    NoImages,

    /// The request cannot be expressed for this model family
    /// (e.g. an edit model with no image inputs).
    #[error("Invalid request for {model}: {reason}")]
    InvalidInput { model: String, reason: String },

    /// A response decoded, but not into the documented shape.
    #[error("Unexpected provider response: {0}")]
    Decode(String),

    /// The poll loop was cancelled by process shutdown.
    #[error("Generation cancelled")]
    Cancelled,
}
