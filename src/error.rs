use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the dispatch pipeline.
///
/// Anything produced by the transport worker is handed to the caller as-is;
/// the client layer never wraps or rewrites it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{code} (HTTP {status}): {message}")]
    Http {
        status: u16,
        code: String,
        message: String,
        retriable: bool,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid url: {0}")]
    Url(String),
    #[error("dispatch queue is closed; no worker is running")]
    QueueClosed,
    #[error("worker dropped the request without a response")]
    ResponseDropped,
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

impl ApiError {
    /// Whether a retry at a higher layer could reasonably succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            ApiError::Http { retriable, .. } => *retriable,
            ApiError::Transport(_) | ApiError::Timeout(_) => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::Url(err.to_string())
    }
}
