//! Provider adapters for the external image-generation services.
//!
//! Three adapters normalize three very different upstream APIs into one
//! request/response shape:
//!
//! - [`kie::KieAdapter`] -- asynchronous task-based service (submit a
//!   task, poll until terminal state or deadline),
//! - [`gemini::GeminiAdapter`] -- synchronous multi-turn call with
//!   inline image parts,
//! - [`imagen::ImagenAdapter`] -- synchronous single-shot prediction.
//!
//! [`router::ProviderRouter`] dispatches on the model's
//! [`ProviderRoute`](artio_core::catalog::ProviderRoute) so the mapping
//! from model family to request shape stays a closed, compiler-checked
//! enum rather than string matching.

pub mod gemini;
pub mod imagen;
pub mod kie;
pub mod router;
pub mod types;

pub use router::{
    DispatchError, ImageProvider, NoopTaskSink, ProviderReply, ProviderRouter, TaskSink,
};
pub use types::{ProviderError, ProviderImage, ProviderOutput, ProviderRequest};
