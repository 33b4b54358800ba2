//! Shared identifier types.
//!
//! Jobs and users are identified by UUIDs minted by the backing store;
//! this crate only ever treats them as opaque values.

/// Identifier of a generation job (caller-supplied, unique).
pub type JobId = uuid::Uuid;

/// Identifier of the owning user, derived from the auth token.
pub type UserId = uuid::Uuid;
