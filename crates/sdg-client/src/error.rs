//! Error types for the data-access client.
//!
//! Only terminal failures cross the public API boundary: "not found in
//! this dataflow" is an expected outcome carried by
//! [`crate::fetcher::FetchOutcome`], never an error.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Malformed input, rejected before any network call.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Every candidate dataflow reported the indicator as not present.
    #[error(
        "indicator `{indicator}` not found in any attempted dataflow (tried: {}); \
         browse available indicators with `sdg indicators` or `sdg search <term>`",
        .attempted.join(", ")
    )]
    IndicatorNotFound {
        indicator: String,
        attempted: Vec<String>,
    },

    /// A request kept failing after the configured number of attempts.
    #[error("request failed after {attempts} attempts: {url}: {message}")]
    FetchFailed {
        url: String,
        attempts: u32,
        message: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Client configuration could not be loaded or is unusable.
    #[error("invalid configuration {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    Metadata(#[from] sdg_metadata::MetadataError),
}

impl ClientError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchFailed { .. })
    }
}
