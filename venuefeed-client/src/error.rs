//! Error types for transport operations.

use thiserror::Error;

/// Error type reported by the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// A request did not complete in time.
    #[error("request timed out: {endpoint}")]
    Timeout {
        /// Endpoint or stream the call was for.
        endpoint: String,
    },

    /// The venue answered with an error status.
    #[error("http status {status} from {endpoint}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Endpoint that failed.
        endpoint: String,
        /// Venue error message.
        message: String,
    },

    /// A subscription was refused.
    #[error("subscription refused for {stream}: {message}")]
    Subscription {
        /// Stream name.
        stream: String,
        /// Venue error message.
        message: String,
    },

    /// Any other I/O level failure.
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
