pub mod generate;
pub mod health;

use axum::routing::post;
use axum::Router;

use crate::state::AppState;

/// All routes mounted under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/generate", post(generate::generate))
}
