use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use artio_api::config::AppConfig;
use artio_api::generation::Orchestrator;
use artio_api::{routes, state};
use artio_providers::gemini::{GeminiAdapter, GeminiConfig};
use artio_providers::imagen::ImagenAdapter;
use artio_providers::kie::{KieAdapter, KieConfig};
use artio_providers::ProviderRouter;
use artio_store::{
    AuthGateway, Backend, HttpAuthGateway, HttpCreditLedger, HttpImageFetcher, HttpImageStore,
    HttpJobStore, HttpRateLimiter, ImageFetcher, ResultMirror,
};

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "artio_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = AppConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Backend connection ---
    let backend = Backend::new(config.backend_url.clone(), config.service_role_key.clone());
    backend
        .health_check()
        .await
        .expect("Backend health check failed");
    tracing::info!("Backend health check passed");

    // Outbound HTTP client shared by the provider adapters and the
    // result fetcher. Per-call timeouts (polling) override this default.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client");

    // --- Store clients ---
    let jobs = Arc::new(HttpJobStore::new(backend.clone()));
    let ledger = Arc::new(HttpCreditLedger::new(backend.clone()));
    let auth: Arc<dyn AuthGateway> = Arc::new(HttpAuthGateway::new(backend.clone()));
    let limiter = Arc::new(HttpRateLimiter::new(
        backend.clone(),
        config.generation.rate_limit_max,
        config.generation.rate_limit_window_secs,
    ));
    let image_store = Arc::new(HttpImageStore::new(
        backend.clone(),
        config.storage_bucket.clone(),
    ));
    let fetcher: Arc<dyn ImageFetcher> = Arc::new(HttpImageFetcher::new(http.clone()));
    let mirror = ResultMirror::new(image_store, Arc::clone(&fetcher));

    // --- Provider adapters ---
    let shutdown_token = CancellationToken::new();

    let kie = KieAdapter::new(
        http.clone(),
        KieConfig {
            api_base: config.kie_api_base.clone(),
            api_key: config.kie_api_key.clone(),
            poll_interval: config.generation.poll_interval,
            poll_deadline: config.generation.poll_deadline,
            attempt_timeout: config.generation.poll_attempt_timeout,
        },
    );
    let gemini_config = GeminiConfig {
        api_base: config.gemini_api_base.clone(),
        api_key: config.gemini_api_key.clone(),
    };
    let gemini = GeminiAdapter::new(http.clone(), gemini_config.clone(), Arc::clone(&fetcher));
    let imagen = ImagenAdapter::new(http.clone(), gemini_config);
    let provider = Arc::new(ProviderRouter::new(
        kie,
        gemini,
        imagen,
        shutdown_token.clone(),
    ));

    // --- Orchestrator ---
    let orchestrator = Arc::new(Orchestrator::new(
        jobs,
        ledger,
        Arc::clone(&auth),
        limiter,
        provider,
        mirror,
        config.generation.clone(),
    ));

    // --- CORS ---
    let cors = build_cors_layer(&config);

    // --- App state ---
    let request_timeout_secs = config.request_timeout_secs;
    let host = config.host.clone();
    let port = config.port;
    let state = AppState {
        config: Arc::new(config),
        backend,
        auth,
        orchestrator,
    };

    // --- Request ID header name ---
    let request_id_header = HeaderName::from_static("x-request-id");

    // --- Router ---
    let app = Router::new()
        // Health check at root level (not under /api/v1).
        .merge(routes::health::router())
        // API v1 routes.
        .nest("/api/v1", routes::api_routes())
        // -- Middleware stack (applied bottom-up) --
        // Panic recovery: catch panics and return 500 JSON.
        .layer(CatchPanicLayer::new())
        // Request timeout. Generous because a successful generation
        // includes up to two minutes of provider polling.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_secs),
        ))
        // Propagate request ID to response.
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        // Structured request/response tracing.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Set request ID on incoming requests.
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        // CORS.
        .layer(cors)
        // Shared state.
        .with_state(state);

    // --- Start server ---
    let addr = SocketAddr::new(host.parse().expect("Invalid HOST address"), port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token))
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes). Cancels the provider
/// token the moment the signal lands: graceful shutdown waits for
/// in-flight requests, and a request stuck in a poll loop would
/// otherwise hold the process open for the whole poll deadline.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }

    // Stop in-flight provider poll loops so draining requests finish
    // promptly instead of running out their poll deadline.
    cancel.cancel();
}

/// Build the CORS middleware layer from server configuration.
///
/// Panics at startup if any configured origin is invalid, which is the
/// desired behaviour -- we want misconfiguration to fail fast.
fn build_cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
