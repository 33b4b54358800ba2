//! Pure domain logic for the Artio generation backend.
//!
//! No I/O lives here: the model catalog, the error taxonomy, request
//! validation, and storage path naming are all plain functions over
//! plain data so they can be unit-tested without a network.

pub mod catalog;
pub mod error;
pub mod generation;
pub mod types;
