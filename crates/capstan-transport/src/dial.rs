//! Scheme-dispatched socket dialing.

use crate::error::{Result, TransportError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;

/// Default daemon socket path for the `unix` scheme.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/docker.sock";

/// Boxed read half of a dialed socket.
pub type BoxedRead = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed write half of a dialed socket.
pub type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

/// Factory for fresh daemon sockets.
///
/// A dialer is an immutable template: every call to [`Dialer::dial`]
/// opens a brand-new socket. [`crate::Connection::sibling`] relies on
/// this to replace a connection that has been hijacked by a protocol
/// upgrade and can no longer carry HTTP.
#[async_trait]
pub trait Dialer: Send + Sync + std::fmt::Debug {
    /// Opens a new socket and returns its read and write halves.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be opened.
    async fn dial(&self) -> Result<(BoxedRead, BoxedWrite)>;

    /// Logical host name used for the `host` request header.
    fn host(&self) -> &str;
}

/// Dialer for `unix://` client URIs.
#[derive(Debug)]
pub struct UnixDialer {
    path: PathBuf,
}

impl UnixDialer {
    /// Creates a dialer for the given socket path.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The socket path this dialer connects to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Dialer for UnixDialer {
    async fn dial(&self) -> Result<(BoxedRead, BoxedWrite)> {
        let stream = UnixStream::connect(&self.path).await?;
        let (read, write) = stream.into_split();
        Ok((Box::new(read), Box::new(write)))
    }

    fn host(&self) -> &str {
        "localhost"
    }
}

/// Builds a dialer from a client URI.
///
/// Only the `unix` scheme is built in; `unix://` with an empty path
/// falls back to [`DEFAULT_SOCKET_PATH`]. Callers with their own
/// transport implement [`Dialer`] directly instead.
///
/// # Errors
///
/// Returns [`TransportError::InvalidAddress`] when the URI has no scheme
/// separator and [`TransportError::UnsupportedScheme`] for any scheme
/// other than `unix`.
pub fn dialer_for_uri(uri: &str) -> Result<Arc<dyn Dialer>> {
    let (scheme, rest) = uri
        .split_once("://")
        .ok_or_else(|| TransportError::InvalidAddress(uri.to_string()))?;

    match scheme {
        "unix" => {
            let path = if rest.is_empty() { DEFAULT_SOCKET_PATH } else { rest };
            Ok(Arc::new(UnixDialer::new(path)))
        }
        other => Err(TransportError::UnsupportedScheme(other.to_string())),
    }
}
