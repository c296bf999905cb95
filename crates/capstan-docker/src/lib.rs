//! # capstan-docker
//!
//! Docker Engine API client (v1.46) speaking directly to the daemon
//! over a Unix domain socket, with no HTTP library underneath.
//!
//! ## Architecture
//!
//! ```text
//! Docker (facade) ──► capstan-http ──► capstan-transport ──► dockerd
//!        │                                   ▲
//!        └── attach/exec ──► capstan-stream ─┘
//! ```
//!
//! Every operation builds a [`Request`], runs it over a short-lived
//! connection, asserts the endpoint's acceptable statuses, and returns
//! the decoded JSON with keys already rewritten into the caller's
//! lowercase-hyphen style:
//!
//! ```no_run
//! use capstan_docker::Docker;
//! use serde_json::json;
//!
//! # async fn demo() -> capstan_docker::Result<()> {
//! let docker = Docker::connect("unix:///var/run/docker.sock")?;
//! let created = docker
//!     .create_container(Some("web"), json!({
//!         "image": "nginx:alpine",
//!         "host-config": {"port-bindings": {"80/tcp": [{"HostPort": "8080"}]}},
//!     }))
//!     .await?;
//! docker.start_container(created["id"].as_str().unwrap_or_default()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Attach and exec upgrade the connection to Docker's multiplexed raw
//! stream and return a [`StreamSession`] with independent stdout/stderr
//! readers and an optional stdin writer.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod containers;
mod error;
mod exec;
mod images;
mod networks;
mod system;
mod volumes;

pub use containers::{StartOutcome, StopOutcome};
pub use error::{DockerError, Result};

pub use capstan_http::{Body, Method, QueryValue, Request, Response, ResponseBody};
pub use capstan_stream::{PipeReader, StderrMode, StreamConfig, StreamSession};
pub use capstan_transport::{dialer_for_uri, Connection, Dialer, UnixDialer, DEFAULT_SOCKET_PATH};

use capstan_http::codec;
use std::sync::Arc;

/// Handle to one daemon.
///
/// Cheap to clone; holds only the immutable client template. Each
/// operation dials its own short-lived connection, so a `Docker` value
/// can be shared freely across tasks.
#[derive(Clone)]
pub struct Docker {
    dialer: Arc<dyn Dialer>,
}

impl Docker {
    /// Connects using a client URI, e.g. `unix:///var/run/docker.sock`.
    ///
    /// # Errors
    ///
    /// Returns an error for unparsable URIs or unsupported schemes.
    pub fn connect(uri: &str) -> Result<Self> {
        Ok(Self {
            dialer: dialer_for_uri(uri)?,
        })
    }

    /// Wraps a custom [`Dialer`] for transports beyond `unix`.
    #[must_use]
    pub fn with_dialer(dialer: Arc<dyn Dialer>) -> Self {
        Self { dialer }
    }

    /// Dials a dedicated connection the caller manages and must close.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be opened.
    pub async fn open_connection(&self) -> Result<Connection> {
        Ok(Connection::dial(Arc::clone(&self.dialer)).await?)
    }

    /// Runs a raw request, on `conn` when given (left open) or on a
    /// short-lived connection otherwise. Escape hatch for endpoints the
    /// named operations do not cover.
    ///
    /// # Errors
    ///
    /// Propagates dial, write, and parse failures; performs no status
    /// assertion.
    pub async fn request(&self, conn: Option<&mut Connection>, req: Request) -> Result<Response> {
        Ok(codec::simple_request(&self.dialer, conn, req).await?)
    }

    /// One short-lived request with a status assertion.
    pub(crate) async fn call(&self, req: Request, accepted: &[u16]) -> Result<Response> {
        let response = codec::simple_request(&self.dialer, None, req).await?;
        Ok(response.assert_status(accepted)?)
    }

    /// Dials a fresh connection and upgrades it into a stream session.
    /// The caller's other connections stay usable.
    pub(crate) async fn upgrade(
        &self,
        req: Request,
        streams: StreamConfig,
    ) -> Result<StreamSession> {
        let conn = Connection::dial(Arc::clone(&self.dialer)).await?;
        Ok(StreamSession::open(conn, req, streams).await?)
    }
}

impl Default for Docker {
    /// Client for the default daemon socket.
    fn default() -> Self {
        Self {
            dialer: Arc::new(UnixDialer::new(DEFAULT_SOCKET_PATH)),
        }
    }
}

impl std::fmt::Debug for Docker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Docker")
            .field("host", &self.dialer.host())
            .finish_non_exhaustive()
    }
}
