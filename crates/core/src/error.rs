use crate::types::JobId;

/// Domain error taxonomy for the generation flow.
///
/// Every variant maps onto exactly one HTTP status in the API layer, so
/// handlers never have to guess which status a failure deserves.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: JobId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The caller's credit balance cannot cover the model's cost.
    #[error("Insufficient credits: {required} required for {model}")]
    InsufficientCredits { required: u32, model: String },

    /// The requested model is restricted to premium subscribers.
    #[error("Model {model} requires a premium subscription")]
    PremiumRequired { model: String },

    /// The per-user fixed-window quota was exceeded.
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    /// The rate limiter itself could not be reached. Distinct from
    /// [`CoreError::RateLimited`]: maps to 503, not 429.
    #[error("Rate limit service unavailable: {0}")]
    RateLimiterUnavailable(String),

    /// Upstream generation failure (task creation, polling, timeout,
    /// zero results). The message is the provider's proximate cause and
    /// is returned to the caller verbatim.
    #[error("{0}")]
    Provider(String),

    /// Download/decode/upload failure while mirroring results.
    #[error("{0}")]
    Storage(String),

    /// Credit ledger RPC failure during deduction.
    #[error("Credit ledger error: {0}")]
    Ledger(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
