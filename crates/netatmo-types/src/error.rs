//! Error types for data parsing in netatmo-types.

use thiserror::Error;

/// Errors that can occur when parsing an upstream payload.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The payload was not valid JSON or did not match the expected shape.
    #[cfg(feature = "serde")]
    #[error("Invalid payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload parsed but reported a failure.
    #[error("Upstream reported status '{0}'")]
    Status(String),
}

/// Result type alias using netatmo-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
