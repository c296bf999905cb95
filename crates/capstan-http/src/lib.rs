//! # capstan-http
//!
//! Hand-rolled HTTP/1.1 request writer and response parser for the
//! Docker Engine API.
//!
//! The daemon speaks a narrow HTTP/1.1 subset: request line + headers +
//! optional chunked body out, status line + headers + chunked or
//! length-delimited body back, optional gzip content encoding, and the
//! `connection: Upgrade` handshake that turns the socket into a raw
//! binary stream. This crate implements exactly that subset, plus two
//! daemon idiosyncrasies: a spurious `0\r\n\r\n` trailing a chunked
//! body, and the same five bytes leaking in front of the next response's
//! status line.
//!
//! JSON payloads are rewritten between the caller's lowercase-hyphen key
//! style and Docker's CamelCase wire style on the way through; see
//! [`names`].

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod error;
pub mod names;
pub mod request;
pub mod response;

pub use codec::{read_response, request, simple_request, write_request, API_PREFIX};
pub use error::{HttpError, Result};
pub use request::{Body, Method, QueryValue, Request};
pub use response::{Response, ResponseBody};
