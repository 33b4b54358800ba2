//! Remote backend clients for the Artio generation flow.
//!
//! The job store, credit ledger, object storage, auth gateway, and rate
//! limiter all live in a managed backend reached over HTTP. Each concern
//! is a small trait with one HTTP implementation; the orchestrator only
//! ever sees the traits, which is what makes the flow testable with
//! in-memory fakes.
//!
//! Schema and stored-procedure internals are the backend's business:
//! this crate treats every call as an opaque remote operation with a
//! documented contract.

pub mod auth;
pub mod backend;
pub mod jobs;
pub mod ledger;
pub mod mirror;
pub mod models;
pub mod rate_limit;
pub mod storage;

pub use auth::{AuthGateway, AuthedUser, HttpAuthGateway};
pub use backend::{Backend, StoreError};
pub use jobs::{HttpJobStore, JobStore};
pub use ledger::{CreditLedger, DeductOutcome, HttpCreditLedger, RefundOutcome};
pub use mirror::{MirrorSource, ResultMirror};
pub use models::{GenerationJob, JobStatus, JobUpdate};
pub use rate_limit::{HttpRateLimiter, RateDecision, RateLimiter};
pub use storage::{HttpImageFetcher, HttpImageStore, ImageFetcher, ImageStore};
