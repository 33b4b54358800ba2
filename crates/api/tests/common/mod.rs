//! Shared test doubles and app construction for the API integration
//! tests.
//!
//! Every remote dependency of the generation flow (job store, ledger,
//! auth, rate limiter, storage, provider) has an in-memory mock here
//! that records its calls, so tests can assert not just outcomes but
//! which side effects did and did not happen.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use artio_api::config::{AppConfig, GenerationSettings};
use artio_api::generation::Orchestrator;
use artio_api::routes;
use artio_api::state::AppState;
use artio_core::types::{JobId, UserId};
use artio_providers::{
    DispatchError, ImageProvider, ProviderImage, ProviderOutput, ProviderReply, ProviderRequest,
    TaskSink,
};
use artio_store::{
    AuthGateway, AuthedUser, Backend, CreditLedger, DeductOutcome, GenerationJob, ImageFetcher,
    ImageStore, JobStatus, JobStore, JobUpdate, RateDecision, RateLimiter, ResultMirror,
    StoreError,
};

// ---------------------------------------------------------------------------
// Job store mock
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockJobStore {
    pub job: Mutex<Option<GenerationJob>>,
    pub updates: Mutex<Vec<JobUpdate>>,
    pub fail_updates: bool,
}

impl MockJobStore {
    pub fn with_job(job: GenerationJob) -> Self {
        Self {
            job: Mutex::new(Some(job)),
            ..Default::default()
        }
    }
}

#[async_trait]
impl JobStore for MockJobStore {
    async fn fetch(&self, _job_id: JobId) -> Result<Option<GenerationJob>, StoreError> {
        Ok(self.job.lock().unwrap().clone())
    }

    async fn update(&self, _job_id: JobId, update: JobUpdate) -> Result<(), StoreError> {
        self.updates.lock().unwrap().push(update);
        if self.fail_updates {
            return Err(StoreError::Api {
                status: 500,
                body: "update failed".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ledger mock
// ---------------------------------------------------------------------------

pub struct MockLedger {
    /// Outcome of the next deduction.
    pub deduct_outcome: DeductOutcome,
    pub fail_deduct: bool,
    pub fail_refunds: bool,
    pub deductions: Mutex<Vec<u32>>,
    pub refunds: Mutex<Vec<u32>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self {
            deduct_outcome: DeductOutcome::Deducted,
            fail_deduct: false,
            fail_refunds: false,
            deductions: Mutex::new(Vec::new()),
            refunds: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CreditLedger for MockLedger {
    async fn deduct(
        &self,
        _user_id: UserId,
        amount: u32,
        _job_id: JobId,
    ) -> Result<DeductOutcome, StoreError> {
        if self.fail_deduct {
            return Err(StoreError::Api {
                status: 500,
                body: "ledger down".into(),
            });
        }
        self.deductions.lock().unwrap().push(amount);
        Ok(self.deduct_outcome)
    }

    async fn refund(
        &self,
        _user_id: UserId,
        amount: u32,
        _job_id: JobId,
    ) -> Result<(), StoreError> {
        self.refunds.lock().unwrap().push(amount);
        if self.fail_refunds {
            return Err(StoreError::Api {
                status: 500,
                body: "refund failed".into(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Auth mock
// ---------------------------------------------------------------------------

pub struct MockAuth {
    /// The user every valid token resolves to; `None` rejects all tokens.
    pub user: Option<UserId>,
    pub premium: bool,
    pub premium_checks: Mutex<u32>,
}

impl MockAuth {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user: Some(user_id),
            premium: false,
            premium_checks: Mutex::new(0),
        }
    }

    pub fn premium_user(user_id: UserId) -> Self {
        Self {
            premium: true,
            ..Self::user(user_id)
        }
    }
}

#[async_trait]
impl AuthGateway for MockAuth {
    async fn resolve_user(&self, _bearer_token: &str) -> Result<Option<AuthedUser>, StoreError> {
        Ok(self.user.map(|id| AuthedUser { id }))
    }

    async fn is_premium(&self, _user_id: UserId) -> Result<bool, StoreError> {
        *self.premium_checks.lock().unwrap() += 1;
        Ok(self.premium)
    }
}

// ---------------------------------------------------------------------------
// Rate limiter mock
// ---------------------------------------------------------------------------

pub struct MockLimiter {
    pub decision: RateDecision,
    pub fail: bool,
}

impl Default for MockLimiter {
    fn default() -> Self {
        Self {
            decision: RateDecision::Allowed,
            fail: false,
        }
    }
}

#[async_trait]
impl RateLimiter for MockLimiter {
    async fn check(&self, _user_id: UserId) -> Result<RateDecision, StoreError> {
        if self.fail {
            return Err(StoreError::Api {
                status: 500,
                body: "limiter unreachable".into(),
            });
        }
        Ok(self.decision)
    }
}

// ---------------------------------------------------------------------------
// Provider mock
// ---------------------------------------------------------------------------

pub enum ProviderBehaviour {
    /// Synchronous provider: return the given hosted URLs, no task.
    Urls(Vec<String>),
    /// Task-based provider: announce the handle, then return URLs.
    TaskUrls { task_id: String, urls: Vec<String> },
    /// Fail with a generation error, optionally after task creation.
    Fail { task_id: Option<String> },
}

pub struct MockProvider {
    pub behaviour: ProviderBehaviour,
    pub calls: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn urls(urls: &[&str]) -> Self {
        Self {
            behaviour: ProviderBehaviour::Urls(urls.iter().map(|s| s.to_string()).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn task_urls(task_id: &str, urls: &[&str]) -> Self {
        Self {
            behaviour: ProviderBehaviour::TaskUrls {
                task_id: task_id.to_string(),
                urls: urls.iter().map(|s| s.to_string()).collect(),
            },
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(task_id: Option<&str>) -> Self {
        Self {
            behaviour: ProviderBehaviour::Fail {
                task_id: task_id.map(String::from),
            },
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ImageProvider for MockProvider {
    async fn generate(
        &self,
        request: &ProviderRequest,
        tasks: &dyn TaskSink,
    ) -> Result<ProviderReply, DispatchError> {
        self.calls.lock().unwrap().push(request.model.id.to_string());
        match &self.behaviour {
            ProviderBehaviour::Urls(urls) => Ok(ProviderReply {
                task_id: None,
                output: ProviderOutput {
                    images: urls.iter().cloned().map(ProviderImage::Url).collect(),
                },
            }),
            ProviderBehaviour::TaskUrls { task_id, urls } => {
                tasks.task_accepted(task_id).await;
                Ok(ProviderReply {
                    task_id: Some(task_id.clone()),
                    output: ProviderOutput {
                        images: urls.iter().cloned().map(ProviderImage::Url).collect(),
                    },
                })
            }
            ProviderBehaviour::Fail { task_id } => {
                if let Some(task_id) = task_id {
                    tasks.task_accepted(task_id).await;
                }
                Err(DispatchError {
                    task_id: task_id.clone(),
                    error: artio_providers::ProviderError::Generation("Generation failed".into()),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Storage mocks
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    pub uploads: Mutex<Vec<String>>,
    pub removals: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageStore for MemoryStore {
    async fn upload(
        &self,
        path: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StoreError> {
        self.uploads.lock().unwrap().push(path.to_string());
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.removals.lock().unwrap().push(path.to_string());
        Ok(())
    }

    async fn signed_url(&self, path: &str, _expires_in_secs: u32) -> Result<String, StoreError> {
        Ok(format!("https://signed.test/{path}"))
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://public.test/{path}")
    }
}

pub struct StubFetcher;

#[async_trait]
impl ImageFetcher for StubFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, StoreError> {
        Ok(vec![0xFF, 0xD8, 0xFF])
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn pending_job(job_id: JobId, user_id: UserId) -> GenerationJob {
    GenerationJob {
        id: job_id,
        user_id,
        status: JobStatus::Pending,
        provider_task_id: None,
        result_urls: None,
        error_message: None,
        completed_at: None,
    }
}

/// Settings with no refund backoff pauses kept short; tests that need
/// backoff timing use `start_paused` instead of changing these.
pub fn test_settings() -> GenerationSettings {
    GenerationSettings::default()
}

pub struct TestHarness {
    pub jobs: Arc<MockJobStore>,
    pub ledger: Arc<MockLedger>,
    pub auth: Arc<MockAuth>,
    pub limiter: Arc<MockLimiter>,
    pub provider: Arc<MockProvider>,
    pub store: Arc<MemoryStore>,
    pub orchestrator: Orchestrator,
}

/// Wire an orchestrator from the given mocks.
pub fn harness(
    jobs: MockJobStore,
    ledger: MockLedger,
    auth: MockAuth,
    limiter: MockLimiter,
    provider: MockProvider,
) -> TestHarness {
    let jobs = Arc::new(jobs);
    let ledger = Arc::new(ledger);
    let auth = Arc::new(auth);
    let limiter = Arc::new(limiter);
    let provider = Arc::new(provider);
    let store = Arc::new(MemoryStore::default());

    let mirror = ResultMirror::new(
        Arc::clone(&store) as Arc<dyn ImageStore>,
        Arc::new(StubFetcher),
    );

    let orchestrator = Orchestrator::new(
        Arc::clone(&jobs) as Arc<dyn JobStore>,
        Arc::clone(&ledger) as Arc<dyn CreditLedger>,
        Arc::clone(&auth) as Arc<dyn AuthGateway>,
        Arc::clone(&limiter) as Arc<dyn RateLimiter>,
        Arc::clone(&provider) as Arc<dyn ImageProvider>,
        mirror,
        test_settings(),
    );

    TestHarness {
        jobs,
        ledger,
        auth,
        limiter,
        provider,
        store,
        orchestrator,
    }
}

// ---------------------------------------------------------------------------
// HTTP app construction
// ---------------------------------------------------------------------------

pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        backend_url: "http://127.0.0.1:1".to_string(),
        service_role_key: "test-service-key".to_string(),
        storage_bucket: "generated-images".to_string(),
        kie_api_base: "http://127.0.0.1:1".to_string(),
        kie_api_key: "test".to_string(),
        gemini_api_base: "http://127.0.0.1:1".to_string(),
        gemini_api_key: "test".to_string(),
        generation: GenerationSettings::default(),
    }
}

/// Build the full application router with the same middleware stack as
/// `main.rs`, but with mocked auth and orchestrator dependencies.
pub fn build_test_app(auth: MockAuth, harness: &TestHarness) -> Router {
    let config = test_config();
    let backend = Backend::new(config.backend_url.clone(), config.service_role_key.clone());

    // Rebuild the orchestrator from the harness's shared mocks so the
    // test can still inspect call records through the harness.
    let mirror = ResultMirror::new(
        Arc::clone(&harness.store) as Arc<dyn ImageStore>,
        Arc::new(StubFetcher),
    );
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&harness.jobs) as Arc<dyn JobStore>,
        Arc::clone(&harness.ledger) as Arc<dyn CreditLedger>,
        Arc::clone(&harness.auth) as Arc<dyn AuthGateway>,
        Arc::clone(&harness.limiter) as Arc<dyn RateLimiter>,
        Arc::clone(&harness.provider) as Arc<dyn ImageProvider>,
        mirror,
        test_settings(),
    ));

    let state = AppState {
        config: Arc::new(config),
        backend,
        auth: Arc::new(auth),
        orchestrator,
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn post_json(
    app: Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
