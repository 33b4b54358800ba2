use std::sync::Arc;

use artio_store::{AuthGateway, Backend};

use crate::config::AppConfig;
use crate::generation::Orchestrator;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<AppConfig>,
    /// Backend connection handle (health checks).
    pub backend: Backend,
    /// Token → user resolution, used by the auth extractor.
    pub auth: Arc<dyn AuthGateway>,
    /// The generation state machine.
    pub orchestrator: Arc<Orchestrator>,
}
