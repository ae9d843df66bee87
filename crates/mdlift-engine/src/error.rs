//! Top-level error taxonomy for a conversion.
//!
//! Render and media failures never reach this level; they are recovered
//! where they happen. Everything here aborts the conversion.

use crate::api::ApiFailure;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// Missing or unusable credentials/configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The Markdown input could not be read or parsed.
    #[error("failed to parse markdown: {0}")]
    Parse(String),

    /// The conversion produced an unusable intermediate state, e.g. a
    /// creation response missing a required field.
    #[error("markdown transform failed: {0}")]
    Transform(String),

    /// A remote call failed and was not recoverable by retrying.
    #[error(transparent)]
    Api(#[from] ApiFailure),
}
