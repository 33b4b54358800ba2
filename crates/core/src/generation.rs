//! Generation request constants, validation, and artifact naming.
//!
//! Provider routing lives in [`crate::catalog`]; this module covers the
//! request-shape rules shared by every provider.

use crate::error::CoreError;
use crate::types::{JobId, UserId};

// ---------------------------------------------------------------------------
// Request limits and defaults
// ---------------------------------------------------------------------------

/// Minimum images per generation call.
pub const MIN_IMAGE_COUNT: u32 = 1;
/// Maximum images per generation call. Keeps mirror latency bounded
/// since results are mirrored sequentially.
pub const MAX_IMAGE_COUNT: u32 = 4;
/// Aspect ratio used when the request omits one.
pub const DEFAULT_ASPECT_RATIO: &str = "1:1";

// ---------------------------------------------------------------------------
// Output format
// ---------------------------------------------------------------------------

/// Stored artifact format. Anything other than an explicit `png`
/// request is normalized to jpg, matching client behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Jpg,
    Png,
}

impl OutputFormat {
    /// Parse a caller-supplied format string.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("png") => OutputFormat::Png,
            _ => OutputFormat::Jpg,
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    /// MIME type for storage uploads.
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Jpg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

// ---------------------------------------------------------------------------
// Artifact naming
// ---------------------------------------------------------------------------

/// Storage object path for the `index`-th artifact of a job:
/// `{user_id}/{job_id}.{ext}` for the first image, `{user_id}/{job_id}_{index}.{ext}`
/// for the rest.
pub fn artifact_path(user_id: UserId, job_id: JobId, index: usize, format: OutputFormat) -> String {
    let ext = format.extension();
    if index == 0 {
        format!("{user_id}/{job_id}.{ext}")
    } else {
        format!("{user_id}/{job_id}_{index}.{ext}")
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate the request fields shared by every provider family.
///
/// The prompt must be non-empty and the image count must fall within
/// `MIN_IMAGE_COUNT..=MAX_IMAGE_COUNT`.
pub fn validate_request(prompt: &str, image_count: u32) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation(
            "prompt must not be empty".to_string(),
        ));
    }
    if !(MIN_IMAGE_COUNT..=MAX_IMAGE_COUNT).contains(&image_count) {
        return Err(CoreError::Validation(format!(
            "imageCount must be between {MIN_IMAGE_COUNT} and {MAX_IMAGE_COUNT}, got {image_count}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
