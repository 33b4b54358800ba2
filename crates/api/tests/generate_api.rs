//! Integration tests for the HTTP surface of `POST /api/v1/generate`:
//! auth extraction, error bodies, and the success response shape.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, harness, pending_job, post_json, MockAuth, MockJobStore,
    MockLedger, MockLimiter, MockProvider,
};
use serde_json::json;
use uuid::Uuid;

use artio_store::{DeductOutcome, RateDecision};

fn request_body(job_id: Uuid, model: &str) -> serde_json::Value {
    json!({
        "jobId": job_id,
        "prompt": "a lighthouse at dusk",
        "model": model,
        "imageCount": 1,
    })
}

#[tokio::test]
async fn missing_auth_header_is_unauthorized() {
    let user = Uuid::new_v4();
    let job_id = Uuid::new_v4();

    let h = harness(
        MockJobStore::with_job(pending_job(job_id, user)),
        MockLedger::default(),
        MockAuth::user(user),
        MockLimiter::default(),
        MockProvider::urls(&["https://cdn.test/a.png"]),
    );
    let app = build_test_app(MockAuth::user(user), &h);

    let response = post_json(
        app,
        "/api/v1/generate",
        None,
        request_body(job_id, "google/imagen4-fast"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
    // No deduction happens for an unauthenticated request.
    assert!(h.ledger.deductions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_token_is_unauthorized() {
    let user = Uuid::new_v4();
    let job_id = Uuid::new_v4();

    let h = harness(
        MockJobStore::with_job(pending_job(job_id, user)),
        MockLedger::default(),
        MockAuth::user(user),
        MockLimiter::default(),
        MockProvider::urls(&["https://cdn.test/a.png"]),
    );
    // Gateway that rejects every token.
    let rejecting = MockAuth {
        user: None,
        premium: false,
        premium_checks: std::sync::Mutex::new(0),
    };
    let app = build_test_app(rejecting, &h);

    let response = post_json(
        app,
        "/api/v1/generate",
        Some("expired-token"),
        request_body(job_id, "google/imagen4-fast"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn body_missing_required_field_is_400_json() {
    let user = Uuid::new_v4();
    let job_id = Uuid::new_v4();

    let h = harness(
        MockJobStore::with_job(pending_job(job_id, user)),
        MockLedger::default(),
        MockAuth::user(user),
        MockLimiter::default(),
        MockProvider::urls(&["https://cdn.test/a.png"]),
    );
    let app = build_test_app(MockAuth::user(user), &h);

    // No prompt field at all.
    let response = post_json(
        app,
        "/api/v1/generate",
        Some("valid-token"),
        json!({ "jobId": job_id }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    let body = body_json(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert!(body["error"].is_string());
    assert!(h.ledger.deductions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn successful_generation_returns_storage_paths() {
    let user = Uuid::new_v4();
    let job_id = Uuid::new_v4();

    let h = harness(
        MockJobStore::with_job(pending_job(job_id, user)),
        MockLedger::default(),
        MockAuth::user(user),
        MockLimiter::default(),
        MockProvider::urls(&["https://cdn.test/a.png", "https://cdn.test/b.png"]),
    );
    let app = build_test_app(MockAuth::user(user), &h);

    let response = post_json(
        app,
        "/api/v1/generate",
        Some("valid-token"),
        request_body(job_id, "google/imagen4-fast"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["jobId"], json!(job_id));
    assert_eq!(
        body["storagePaths"],
        json!([
            format!("{user}/{job_id}.jpg"),
            format!("{user}/{job_id}_1.jpg"),
        ])
    );
}

#[tokio::test]
async fn insufficient_credits_body_names_cost_and_model() {
    let user = Uuid::new_v4();
    let job_id = Uuid::new_v4();

    let h = harness(
        MockJobStore::with_job(pending_job(job_id, user)),
        MockLedger {
            deduct_outcome: DeductOutcome::InsufficientCredits,
            ..Default::default()
        },
        MockAuth::user(user),
        MockLimiter::default(),
        MockProvider::urls(&["https://cdn.test/a.png"]),
    );
    let app = build_test_app(MockAuth::user(user), &h);

    let response = post_json(
        app,
        "/api/v1/generate",
        Some("valid-token"),
        request_body(job_id, "google/imagen4"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Insufficient credits");
    assert_eq!(body["required"], 16);
    assert_eq!(body["model"], "google/imagen4");
}

#[tokio::test]
async fn premium_model_for_free_user_is_forbidden_with_flag() {
    let user = Uuid::new_v4();
    let job_id = Uuid::new_v4();

    let h = harness(
        MockJobStore::with_job(pending_job(job_id, user)),
        MockLedger::default(),
        MockAuth::user(user),
        MockLimiter::default(),
        MockProvider::urls(&["https://cdn.test/a.png"]),
    );
    let app = build_test_app(MockAuth::user(user), &h);

    let response = post_json(
        app,
        "/api/v1/generate",
        Some("valid-token"),
        request_body(job_id, "google/imagen4-ultra"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["premiumRequired"], true);
    assert_eq!(body["model"], "google/imagen4-ultra");
}

#[tokio::test]
async fn rate_limited_response_carries_retry_after() {
    let user = Uuid::new_v4();
    let job_id = Uuid::new_v4();

    let h = harness(
        MockJobStore::with_job(pending_job(job_id, user)),
        MockLedger::default(),
        MockAuth::user(user),
        MockLimiter {
            decision: RateDecision::Limited {
                retry_after_secs: 30,
            },
            fail: false,
        },
        MockProvider::urls(&["https://cdn.test/a.png"]),
    );
    let app = build_test_app(MockAuth::user(user), &h);

    let response = post_json(
        app,
        "/api/v1/generate",
        Some("valid-token"),
        request_body(job_id, "google/imagen4-fast"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Rate limit exceeded");
    assert_eq!(body["retry_after"], 30);
}

#[tokio::test]
async fn unreachable_limiter_maps_to_service_unavailable() {
    let user = Uuid::new_v4();
    let job_id = Uuid::new_v4();

    let h = harness(
        MockJobStore::with_job(pending_job(job_id, user)),
        MockLedger::default(),
        MockAuth::user(user),
        MockLimiter {
            decision: RateDecision::Allowed,
            fail: true,
        },
        MockProvider::urls(&["https://cdn.test/a.png"]),
    );
    let app = build_test_app(MockAuth::user(user), &h);

    let response = post_json(
        app,
        "/api/v1/generate",
        Some("valid-token"),
        request_body(job_id, "google/imagen4-fast"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn claimed_job_conflicts() {
    let user = Uuid::new_v4();
    let job_id = Uuid::new_v4();

    let mut job = pending_job(job_id, user);
    job.status = artio_store::JobStatus::Completed;

    let h = harness(
        MockJobStore::with_job(job),
        MockLedger::default(),
        MockAuth::user(user),
        MockLimiter::default(),
        MockProvider::urls(&["https://cdn.test/a.png"]),
    );
    let app = build_test_app(MockAuth::user(user), &h);

    let response = post_json(
        app,
        "/api/v1/generate",
        Some("valid-token"),
        request_body(job_id, "google/imagen4-fast"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn provider_failure_maps_to_500_with_proximate_message() {
    let user = Uuid::new_v4();
    let job_id = Uuid::new_v4();

    let h = harness(
        MockJobStore::with_job(pending_job(job_id, user)),
        MockLedger::default(),
        MockAuth::user(user),
        MockLimiter::default(),
        MockProvider::failing(None),
    );
    let app = build_test_app(MockAuth::user(user), &h);

    let response = post_json(
        app,
        "/api/v1/generate",
        Some("valid-token"),
        request_body(job_id, "google/imagen4-fast"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Generation failed");
    assert_eq!(body["code"], "GENERATION_FAILED");
}
