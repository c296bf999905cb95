//! # capstan-stream
//!
//! Hijacked-connection plumbing for attach and exec.
//!
//! After a `101 Switching Protocols` response the socket stops being
//! HTTP and becomes a stream of Docker frames: an 8-byte header
//! (`[stream_id:1][0:3][len:4 BE]`) followed by `len` opaque bytes,
//! stdout and stderr interleaved, with the caller free to write raw
//! stdin bytes in the other direction.
//!
//! ```text
//!            ┌────────────────────────────────────┐
//!  socket ──►│ demux task                         │
//!            │   id 1 ──► stdout pipe ──► reader  │
//!            │   id 2 ──► stderr pipe ──► reader  │
//!            └────────────────────────────────────┘
//!  caller ──────────────► write half (stdin)
//! ```
//!
//! [`StreamSession`] owns all of it: the demultiplexer task, both
//! pipes, and the connection's write half.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod demux;
pub mod error;
pub mod pipe;
pub mod session;

pub use error::{Result, SessionError};
pub use pipe::{pipe, PipeClosed, PipeReader, PipeWriter};
pub use session::{StderrMode, StreamConfig, StreamSession, MULTIPLEXED_STREAM};
