use std::time::Duration;

/// Server and integration configuration loaded once at process start.
///
/// No component reads the environment after startup: everything flows
/// from this struct, passed by reference through [`crate::state::AppState`].
/// A missing required variable is a startup failure, not something the
/// request path ever has to handle.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `180`; polling can
    /// legitimately take two minutes).
    pub request_timeout_secs: u64,
    /// Backend project base URL (`BACKEND_URL`, required).
    pub backend_url: String,
    /// Backend service role key (`SERVICE_ROLE_KEY`, required).
    pub service_role_key: String,
    /// Storage bucket for mirrored results (default: `generated-images`).
    pub storage_bucket: String,
    /// Task-based provider base URL (default: `https://api.kie.ai`).
    pub kie_api_base: String,
    /// Task-based provider API key (`KIE_API_KEY`, required).
    pub kie_api_key: String,
    /// Synchronous providers' base URL.
    pub gemini_api_base: String,
    /// Synchronous providers' API key (`GEMINI_API_KEY`, required).
    pub gemini_api_key: String,
    /// Generation flow tunables.
    pub generation: GenerationSettings,
}

/// Tunables for the orchestrated generation flow.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Fixed-window rate limit: max requests per window per user.
    pub rate_limit_max: u32,
    /// Fixed-window length in seconds.
    pub rate_limit_window_secs: u32,
    /// Maximum refund attempts before flagging manual intervention.
    pub refund_max_attempts: u32,
    /// Signed URL lifetime for image inputs handed to providers.
    pub signed_url_ttl_secs: u32,
    /// Poll interval for the task-based provider.
    pub poll_interval: Duration,
    /// Overall poll deadline per task.
    pub poll_deadline: Duration,
    /// Timeout per individual poll request.
    pub poll_attempt_timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            rate_limit_max: 5,
            rate_limit_window_secs: 60,
            refund_max_attempts: 3,
            signed_url_ttl_secs: 3600,
            poll_interval: Duration::from_secs(2),
            poll_deadline: Duration::from_secs(120),
            poll_attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                | Default                                         |
    /// |------------------------|-------------------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                                       |
    /// | `PORT`                 | `3000`                                          |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`                         |
    /// | `REQUEST_TIMEOUT_SECS` | `180`                                           |
    /// | `BACKEND_URL`          | required                                        |
    /// | `SERVICE_ROLE_KEY`     | required                                        |
    /// | `STORAGE_BUCKET`       | `generated-images`                              |
    /// | `KIE_API_BASE`         | `https://api.kie.ai`                            |
    /// | `KIE_API_KEY`          | required                                        |
    /// | `GEMINI_API_BASE`      | `https://generativelanguage.googleapis.com/v1beta` |
    /// | `GEMINI_API_KEY`       | required                                        |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "180".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let backend_url = std::env::var("BACKEND_URL").expect("BACKEND_URL must be set");
        let service_role_key =
            std::env::var("SERVICE_ROLE_KEY").expect("SERVICE_ROLE_KEY must be set");

        let storage_bucket =
            std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| "generated-images".into());

        let kie_api_base =
            std::env::var("KIE_API_BASE").unwrap_or_else(|_| "https://api.kie.ai".into());
        let kie_api_key = std::env::var("KIE_API_KEY").expect("KIE_API_KEY must be set");

        let gemini_api_base = std::env::var("GEMINI_API_BASE")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
        let gemini_api_key = std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            backend_url,
            service_role_key,
            storage_bucket,
            kie_api_base,
            kie_api_key,
            gemini_api_base,
            gemini_api_key,
            generation: GenerationSettings::default(),
        }
    }
}
