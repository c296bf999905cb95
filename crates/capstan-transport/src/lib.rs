//! # capstan-transport
//!
//! Socket transport and HTTP body framing for capstan.
//!
//! This crate owns everything below the HTTP request/response line:
//!
//! - [`Dialer`]: scheme-dispatched factory producing fresh daemon sockets
//!   (`unix` built in, other transports pluggable)
//! - [`Connection`]: a dialed socket with buffered halves and a push-back
//!   capable reader
//! - [`ChunkedReader`] / [`ChunkedWriter`]: HTTP chunked transfer framing,
//!   including tolerance for the daemon's spurious trailing empty chunk
//! - [`LimitedReader`]: exposes exactly `content-length` bytes of a stream
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │               capstan-transport                  │
//! │                                                  │
//! │   Dialer ──► Connection                          │
//! │                 │  read: PushbackReader          │
//! │                 │  write: BufWriter              │
//! │                 ▼                                │
//! │   ChunkedReader / LimitedReader / ChunkedWriter  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! The push-back reader exists for one reason: the daemon often repeats
//! the terminal `0\r\n\r\n` of a chunked body, and absorbing it safely
//! needs a few bytes of look-ahead that can be returned to the stream.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod chunked;
pub mod conn;
pub mod dial;
pub mod error;
pub mod limit;
pub mod read;

pub use chunked::{ChunkedReader, ChunkedWriter};
pub use conn::{ConnReader, ConnWriter, Connection};
pub use dial::{dialer_for_uri, BoxedRead, BoxedWrite, Dialer, UnixDialer, DEFAULT_SOCKET_PATH};
pub use error::{Result, TransportError};
pub use limit::LimitedReader;
pub use read::PushbackReader;
