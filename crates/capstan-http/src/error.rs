//! Error types for the HTTP codec.

use crate::response::Response;
use capstan_transport::TransportError;
use thiserror::Error;

/// Result type alias for HTTP operations.
pub type Result<T> = std::result::Result<T, HttpError>;

/// Errors that can occur while writing a request or reading a response.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Failure dialing or using the underlying socket.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// I/O failure while framing a body or reading the wire.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed wire data: status line, header, or body framing.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Response status outside the caller-declared acceptable set.
    ///
    /// Carries the full response for diagnostics; `message` is the
    /// daemon's JSON `message` field when the body had one.
    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus {
        status: u16,
        message: String,
        response: Box<Response>,
    },

    /// Body type or content type this client cannot handle.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// JSON encode/decode failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HttpError {
    /// Creates a protocol error with diagnostic context.
    #[must_use]
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}
