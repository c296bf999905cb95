//! Error types for transport operations.

use thiserror::Error;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while dialing or using a connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error from the socket or its buffers.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Client URI scheme not recognized by any dialer.
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// Client URI could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}
