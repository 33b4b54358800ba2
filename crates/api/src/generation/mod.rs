//! The generation flow: orchestrator and its request parameters.

mod orchestrator;

pub use orchestrator::{GenerateParams, Orchestrator, REFUND_FAILED_MARKER};
