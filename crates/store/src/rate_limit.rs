//! Fixed-window rate limit gate.
//!
//! The counting itself happens in a backend remote procedure so that
//! concurrent invocations share one window. A transport failure on the
//! check is surfaced as an error -- the API layer maps it to 503, which
//! must stay distinct from a 429 limit rejection.

use artio_core::types::UserId;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::backend::{Backend, StoreError};

/// Verdict of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after_secs: u32 },
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count this request against the user's window and return the
    /// verdict. `Err` means the limiter itself was unreachable.
    async fn check(&self, user_id: UserId) -> Result<RateDecision, StoreError>;
}

/// [`RateLimiter`] over the backend's `check_generation_rate_limit`
/// remote procedure.
pub struct HttpRateLimiter {
    backend: Backend,
    max_requests: u32,
    window_secs: u32,
}

impl HttpRateLimiter {
    pub fn new(backend: Backend, max_requests: u32, window_secs: u32) -> Self {
        Self {
            backend,
            max_requests,
            window_secs,
        }
    }
}

#[derive(Deserialize)]
struct RateLimitResponse {
    allowed: bool,
    #[serde(default)]
    retry_after: u32,
}

#[async_trait]
impl RateLimiter for HttpRateLimiter {
    async fn check(&self, user_id: UserId) -> Result<RateDecision, StoreError> {
        let verdict: RateLimitResponse = self
            .backend
            .rpc(
                "check_generation_rate_limit",
                &json!({
                    "p_user_id": user_id,
                    "p_max_requests": self.max_requests,
                    "p_window_seconds": self.window_secs,
                }),
            )
            .await?;

        if verdict.allowed {
            Ok(RateDecision::Allowed)
        } else {
            Ok(RateDecision::Limited {
                retry_after_secs: verdict.retry_after,
            })
        }
    }
}
