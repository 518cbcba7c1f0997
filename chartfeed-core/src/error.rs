//! Error types for the datafeed

use thiserror::Error;

/// Datafeed-wide error type
///
/// Socket-level failures never show up here: the connection supervisor
/// recovers them internally and reports them through the status channel.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("unsupported period: {0}")]
    UnsupportedPeriod(String),

    #[error("{endpoint} request failed with status {status}")]
    RequestFailed { endpoint: &'static str, status: u16 },

    #[error("malformed {endpoint} response: {reason}")]
    MalformedResponse {
        endpoint: &'static str,
        reason: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("datafeed has been shut down")]
    Closed,
}

impl FeedError {
    pub fn unsupported_period(token: impl Into<String>) -> Self {
        FeedError::UnsupportedPeriod(token.into())
    }

    pub fn request_failed(endpoint: &'static str, status: u16) -> Self {
        FeedError::RequestFailed { endpoint, status }
    }

    pub fn malformed(endpoint: &'static str, reason: impl Into<String>) -> Self {
        FeedError::MalformedResponse {
            endpoint,
            reason: reason.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        FeedError::Transport(msg.into())
    }
}

/// Result type alias for datafeed operations
pub type FeedResult<T> = Result<T, FeedError>;
