//! Buffered reading with push-back.

use std::collections::VecDeque;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// How much is pulled from the underlying stream per refill.
const FILL_CHUNK: usize = 8 * 1024;

/// A buffered reader that can return consumed bytes to the stream.
///
/// The HTTP parser needs two things an ordinary buffered reader does not
/// give it: a way to hand back bytes that turned out to belong to the
/// next response (the daemon's trailing-empty-chunk quirk needs up to
/// five bytes of look-ahead), and a way to consume bytes that are
/// already buffered without ever touching the socket.
///
/// The wrapper never closes the underlying stream.
pub struct PushbackReader<R> {
    inner: R,
    buf: VecDeque<u8>,
}

impl<R: AsyncRead + Unpin> PushbackReader<R> {
    /// Wraps an underlying stream.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: VecDeque::with_capacity(FILL_CHUNK),
        }
    }

    /// Returns `bytes` to the stream; the next read yields them first,
    /// in the order given.
    pub fn push_back(&mut self, bytes: &[u8]) {
        for &b in bytes.iter().rev() {
            self.buf.push_front(b);
        }
    }

    /// Number of bytes available without touching the underlying stream.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drains up to `out.len()` already-buffered bytes. Never reads the
    /// underlying stream.
    pub fn read_buffered(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.buf.len());
        for (slot, byte) in out.iter_mut().zip(self.buf.drain(..n)) {
            *slot = byte;
        }
        n
    }

    async fn fill(&mut self) -> io::Result<usize> {
        let mut chunk = [0u8; FILL_CHUNK];
        let n = self.inner.read(&mut chunk).await?;
        self.buf.extend(&chunk[..n]);
        Ok(n)
    }

    /// Reads up to `out.len()` bytes, refilling from the underlying
    /// stream when the buffer is empty. Returns 0 only at end-of-stream.
    pub async fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        if self.buf.is_empty() && self.fill().await? == 0 {
            return Ok(0);
        }
        Ok(self.read_buffered(out))
    }

    /// Reads exactly `out.len()` bytes or fails with `UnexpectedEof`.
    pub async fn read_exact(&mut self, out: &mut [u8]) -> io::Result<()> {
        let mut filled = 0;
        while filled < out.len() {
            let n = self.read(&mut out[filled..]).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream ended after {filled} of {} bytes", out.len()),
                ));
            }
            filled += n;
        }
        Ok(())
    }

    /// Reads one line, up to and including the `\n`.
    ///
    /// Fails with `UnexpectedEof` if the stream ends mid-line and with
    /// `InvalidData` if no `\n` appears within `max` bytes.
    pub async fn read_line(&mut self, max: usize) -> io::Result<Vec<u8>> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                return Ok(self.buf.drain(..=pos).collect());
            }
            if self.buf.len() >= max {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line exceeds {max} bytes"),
                ));
            }
            if self.fill().await? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended mid-line",
                ));
            }
        }
    }
}
