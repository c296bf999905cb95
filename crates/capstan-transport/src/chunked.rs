//! HTTP chunked transfer framing.
//!
//! Wire format per chunk: `HEX(len)\r\n<payload>\r\n`, terminated by
//! `0\r\n\r\n`. The daemon frequently repeats the terminal sequence once
//! more after a well-formed body; [`ChunkedReader`] discards that repeat
//! when its bytes are already buffered and pushes any partial match back
//! so the next response parses untouched.

use crate::read::PushbackReader;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// The terminal chunk sequence the daemon sometimes emits twice.
const TRAILING_EMPTY_CHUNK: &[u8; 5] = b"0\r\n\r\n";

/// Payload buffered per chunk on the write side. Small enough to keep
/// latency low, large enough that framing overhead stays negligible.
const WRITE_BUF: usize = 256;

/// Guard against absurd chunk-length lines.
const MAX_LEN_DIGITS: u32 = 8;

fn hex_digit(byte: u8) -> Option<usize> {
    match byte {
        b'0'..=b'9' => Some(usize::from(byte - b'0')),
        b'a'..=b'f' => Some(usize::from(byte - b'a') + 10),
        b'A'..=b'F' => Some(usize::from(byte - b'A') + 10),
        _ => None,
    }
}

fn protocol(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingChunkLen,
    InChunk(usize),
    Terminated,
}

/// Decoder for a chunked response body.
///
/// Borrows the connection's reader for the duration of one body; once
/// `read` returns 0 the stream is positioned exactly one byte past the
/// body, including when the daemon appended its spurious `0\r\n\r\n`.
pub struct ChunkedReader<'a, R> {
    src: &'a mut PushbackReader<R>,
    state: State,
}

impl<'a, R: AsyncRead + Unpin> ChunkedReader<'a, R> {
    pub fn new(src: &'a mut PushbackReader<R>) -> Self {
        Self {
            src,
            state: State::AwaitingChunkLen,
        }
    }

    /// Reads up to `out.len()` payload bytes. Returns 0 once the
    /// terminal chunk has been consumed.
    pub async fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.state {
                State::Terminated => return Ok(0),
                State::AwaitingChunkLen => {
                    let len = self.read_chunk_len().await?;
                    if len == 0 {
                        self.expect_crlf().await?;
                        absorb_trailing_empty_chunk(self.src);
                        self.state = State::Terminated;
                        return Ok(0);
                    }
                    self.state = State::InChunk(len);
                }
                State::InChunk(remaining) => {
                    let want = remaining.min(out.len());
                    let n = self.src.read(&mut out[..want]).await?;
                    if n == 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!("stream ended with {remaining} bytes left in chunk"),
                        ));
                    }
                    if n == remaining {
                        self.expect_crlf().await?;
                        self.state = State::AwaitingChunkLen;
                    } else {
                        self.state = State::InChunk(remaining - n);
                    }
                    return Ok(n);
                }
            }
        }
    }

    /// Drains the remaining payload into one buffer.
    pub async fn read_to_end(mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = [0u8; 8 * 1024];
        loop {
            let n = self.read(&mut buf).await?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    /// Parses `HEX(len)\r\n`. Chunk extensions are not expected from the
    /// daemon and are rejected.
    async fn read_chunk_len(&mut self) -> io::Result<usize> {
        let mut len: usize = 0;
        let mut digits = 0u32;
        loop {
            let mut byte = [0u8; 1];
            self.src.read_exact(&mut byte).await?;
            if byte[0] == b'\r' {
                break;
            }
            let value = hex_digit(byte[0])
                .ok_or_else(|| protocol(format!("invalid chunk length byte 0x{:02x}", byte[0])))?;
            digits += 1;
            if digits > MAX_LEN_DIGITS {
                return Err(protocol("chunk length out of range".to_string()));
            }
            len = len * 16 + value;
        }
        if digits == 0 {
            return Err(protocol("empty chunk length".to_string()));
        }
        let mut lf = [0u8; 1];
        self.src.read_exact(&mut lf).await?;
        if lf[0] != b'\n' {
            return Err(protocol(format!(
                "expected LF after chunk length, got 0x{:02x}",
                lf[0]
            )));
        }
        Ok(len)
    }

    async fn expect_crlf(&mut self) -> io::Result<()> {
        let mut pair = [0u8; 2];
        self.src.read_exact(&mut pair).await?;
        if &pair != b"\r\n" {
            return Err(protocol(format!(
                "expected CRLF after chunk, got 0x{:02x} 0x{:02x}",
                pair[0], pair[1]
            )));
        }
        Ok(())
    }
}

/// Discards the daemon's repeat of the terminal chunk.
///
/// Matches only against bytes the reader has already buffered, so it
/// never blocks on the socket. A partial match is pushed back verbatim;
/// if the repeat straddles a buffer boundary, the response parser's own
/// leaked-chunk handling picks it up in front of the next status line.
fn absorb_trailing_empty_chunk<R: AsyncRead + Unpin>(src: &mut PushbackReader<R>) {
    let mut consumed = Vec::with_capacity(TRAILING_EMPTY_CHUNK.len());
    while consumed.len() < TRAILING_EMPTY_CHUNK.len() && src.buffered() > 0 {
        let mut byte = [0u8; 1];
        src.read_buffered(&mut byte);
        consumed.push(byte[0]);
        if byte[0] != TRAILING_EMPTY_CHUNK[consumed.len() - 1] {
            src.push_back(&consumed);
            return;
        }
    }
    if consumed.len() < TRAILING_EMPTY_CHUNK.len() {
        src.push_back(&consumed);
    }
}

/// Encoder for a chunked request body.
///
/// Buffers payload and emits one chunk per flush; `finish` writes the
/// terminal chunk. Never closes or flushes the underlying stream.
pub struct ChunkedWriter<'a, W> {
    dst: &'a mut W,
    buf: Vec<u8>,
}

impl<'a, W: AsyncWrite + Unpin> ChunkedWriter<'a, W> {
    pub fn new(dst: &'a mut W) -> Self {
        Self {
            dst,
            buf: Vec::with_capacity(WRITE_BUF),
        }
    }

    /// Appends payload, emitting full chunks as the buffer fills.
    pub async fn write_all(&mut self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            let room = WRITE_BUF - self.buf.len();
            let take = room.min(data.len());
            self.buf.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.buf.len() == WRITE_BUF {
                self.flush_chunk().await?;
            }
        }
        Ok(())
    }

    async fn flush_chunk(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let header = format!("{:x}\r\n", self.buf.len());
        self.dst.write_all(header.as_bytes()).await?;
        self.dst.write_all(&self.buf).await?;
        self.dst.write_all(b"\r\n").await?;
        self.buf.clear();
        Ok(())
    }

    /// Flushes any residual payload and emits the terminal chunk.
    pub async fn finish(mut self) -> io::Result<()> {
        self.flush_chunk().await?;
        self.dst.write_all(TRAILING_EMPTY_CHUNK).await
    }
}
