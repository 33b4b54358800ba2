use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use artio_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific
/// variants. Implements [`IntoResponse`] so every failure becomes a
/// consistent JSON body with an `error` field, plus the extra fields
/// some statuses carry (`required`, `retry_after`, `premiumRequired`).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `artio_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// JSON body extractor whose rejection is an [`AppError`], so a
/// missing or malformed field comes back as a 400 with the same
/// `{error, code}` JSON shape as every other failure instead of
/// axum's default plain-text 422.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(AppJson(value))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, mut body) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    json!({ "error": format!("{entity} with id {id} not found") }),
                ),
                CoreError::Validation(msg) => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    json!({ "error": msg }),
                ),
                CoreError::Conflict(msg) => {
                    (StatusCode::CONFLICT, "CONFLICT", json!({ "error": msg }))
                }
                CoreError::Unauthorized(msg) => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    json!({ "error": msg }),
                ),
                CoreError::Forbidden(msg) => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", json!({ "error": msg }))
                }
                CoreError::InsufficientCredits { required, model } => (
                    StatusCode::PAYMENT_REQUIRED,
                    "INSUFFICIENT_CREDITS",
                    json!({
                        "error": "Insufficient credits",
                        "required": required,
                        "model": model,
                    }),
                ),
                CoreError::PremiumRequired { model } => (
                    StatusCode::FORBIDDEN,
                    "PREMIUM_REQUIRED",
                    json!({
                        "error": "This model requires a premium subscription",
                        "model": model,
                        "premiumRequired": true,
                    }),
                ),
                CoreError::RateLimited { retry_after_secs } => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMITED",
                    json!({
                        "error": "Rate limit exceeded",
                        "retry_after": retry_after_secs,
                    }),
                ),
                CoreError::RateLimiterUnavailable(msg) => {
                    tracing::error!(error = %msg, "Rate limiter unavailable");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "RATE_LIMITER_UNAVAILABLE",
                        json!({ "error": "Rate limit service unavailable" }),
                    )
                }
                // Provider and storage failures surface their proximate
                // cause to the caller; refund status never leaks here.
                CoreError::Provider(msg) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "GENERATION_FAILED",
                    json!({ "error": msg }),
                ),
                CoreError::Storage(msg) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_FAILED",
                    json!({ "error": msg }),
                ),
                CoreError::Ledger(msg) => {
                    tracing::error!(error = %msg, "Ledger error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "LEDGER_ERROR",
                        json!({ "error": "Credit check failed" }),
                    )
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        json!({ "error": "An internal error occurred" }),
                    )
                }
            },

            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                json!({ "error": msg }),
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    json!({ "error": "An internal error occurred" }),
                )
            }
        };

        body["code"] = json!(code);
        (status, axum::Json(body)).into_response()
    }
}
