//! Error types for dashboard API calls.

use thiserror::Error;

/// Errors returned by the dashboard client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The dashboard URL cannot be used as an API base.
    #[error("invalid dashboard URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The API key cannot be sent as a header value.
    #[error("API key contains characters that are not allowed in a header")]
    InvalidKey,

    /// The operation needs the v2 API but the client only has v1.
    #[error("{operation} requires the v2 API, but no API key is configured for {site}")]
    RequiresV2 {
        operation: &'static str,
        site: String,
    },

    /// The dashboard answered with a non-success status.
    #[error("dashboard returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("failed to decode dashboard response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Transport failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ClientError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
