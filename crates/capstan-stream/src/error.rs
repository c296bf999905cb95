//! Error types for attach/exec sessions.

use capstan_http::HttpError;
use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors that can occur while establishing or running a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The upgrade request itself failed at the HTTP layer.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The daemon answered the upgrade request with a non-101 status.
    #[error("upgrade rejected with status {status}: {message}")]
    UpgradeRejected { status: u16, message: String },

    /// 101 arrived, but not with the multiplexed-stream content type.
    #[error("unexpected upgrade content type: {0:?}")]
    UnexpectedContentType(String),
}
