//! Error type for the client facade.

use capstan_http::HttpError;
use capstan_stream::SessionError;
use capstan_transport::TransportError;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, DockerError>;

/// Errors surfaced by [`crate::Docker`] operations.
#[derive(Debug, Error)]
pub enum DockerError {
    /// Dialing or socket failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Wire-level failure or unexpected response status.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Attach/exec upgrade failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// I/O failure while driving a session's streams.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DockerError {
    /// The response status, when the error is an unexpected status.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(HttpError::UnexpectedStatus { status, .. }) => Some(*status),
            Self::Session(SessionError::UpgradeRejected { status, .. }) => Some(*status),
            _ => None,
        }
    }
}
