//! Error types for netatmo-core.
//!
//! Every error here belongs to the refresh path. None of them ever reaches a
//! scrape: the collector records the display text of the last failure and
//! reports it only through the `up` gauge and the health endpoint.
//!
//! | Error Type | Typical cause |
//! |------------|---------------|
//! | [`Error::Http`] | Network failure or request timeout |
//! | [`Error::Api`] | Upstream returned a non-success status |
//! | [`Error::Auth`] | Token endpoint rejected the credentials |
//! | [`Error::Parse`] | Response body did not match the expected shape |
//! | [`Error::InvalidConfig`] | Client constructed with a bad base URL |
//! | [`Error::TaskFailed`] | Refresh task panicked or was cancelled |
//! | [`Error::Mock`] | Failure injected by [`crate::MockSource`] |
//!
//! There is no retry policy in this crate. A failed refresh is simply tried
//! again once the refresh interval has elapsed.

use thiserror::Error;

use netatmo_types::ParseError;

/// Errors that can occur while reading station data.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// HTTP transport error, including timeouts.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream API returned an error response.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Access token could not be obtained.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Response body could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The background refresh task did not run to completion.
    #[error("Refresh task failed: {0}")]
    TaskFailed(String),

    /// Failure injected by the mock source.
    #[error("Mock failure: {0}")]
    Mock(String),
}

/// Result type alias using netatmo-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
