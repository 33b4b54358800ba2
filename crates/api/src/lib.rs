//! Artio generation API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! the generation orchestrator) so integration tests and the binary
//! entrypoint can both access them.

pub mod config;
pub mod error;
pub mod generation;
pub mod middleware;
pub mod routes;
pub mod state;
