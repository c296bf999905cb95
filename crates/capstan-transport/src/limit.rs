//! Length-bounded reading.

use crate::read::PushbackReader;
use std::io;
use tokio::io::AsyncRead;

/// Exposes exactly `remaining` bytes of the underlying reader.
///
/// Used for `content-length` delimited response bodies. Reads report
/// end-of-stream once the remaining count hits zero; the underlying
/// stream is never closed and its next byte is the one after the body.
pub struct LimitedReader<'a, R> {
    src: &'a mut PushbackReader<R>,
    remaining: u64,
}

impl<'a, R: AsyncRead + Unpin> LimitedReader<'a, R> {
    pub fn new(src: &'a mut PushbackReader<R>, len: u64) -> Self {
        Self {
            src,
            remaining: len,
        }
    }

    /// Reads up to `min(out.len(), remaining)` bytes.
    pub async fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || out.is_empty() {
            return Ok(0);
        }
        let want = usize::try_from(self.remaining)
            .unwrap_or(usize::MAX)
            .min(out.len());
        let n = self.src.read(&mut out[..want]).await?;
        self.remaining -= n as u64;
        Ok(n)
    }

    /// Reads all remaining bytes, failing with `UnexpectedEof` if the
    /// underlying stream ends early.
    pub async fn read_to_end(mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = [0u8; 8 * 1024];
        loop {
            let n = self.read(&mut buf).await?;
            if n == 0 {
                if self.remaining > 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("body ended with {} bytes left to read", self.remaining),
                    ));
                }
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_stops_at_bound() {
        let mut src = PushbackReader::new(Cursor::new(b"0123456789".to_vec()));
        let body = LimitedReader::new(&mut src, 4).read_to_end().await.unwrap();
        assert_eq!(body, b"0123");

        // The rest of the stream is untouched.
        let mut rest = [0u8; 6];
        src.read_exact(&mut rest).await.unwrap();
        assert_eq!(&rest, b"456789");
    }

    #[tokio::test]
    async fn test_zero_length_is_empty() {
        let mut src = PushbackReader::new(Cursor::new(b"abc".to_vec()));
        let body = LimitedReader::new(&mut src, 0).read_to_end().await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_short_stream_is_an_error() {
        let mut src = PushbackReader::new(Cursor::new(b"ab".to_vec()));
        let err = LimitedReader::new(&mut src, 5)
            .read_to_end()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_partial_reads_decrement() {
        let mut src = PushbackReader::new(Cursor::new(b"abcdef".to_vec()));
        let mut limited = LimitedReader::new(&mut src, 5);
        let mut buf = [0u8; 2];
        assert_eq!(limited.read(&mut buf).await.unwrap(), 2);
        assert_eq!(limited.read(&mut buf).await.unwrap(), 2);
        assert_eq!(limited.read(&mut buf).await.unwrap(), 1);
        assert_eq!(limited.read(&mut buf).await.unwrap(), 0);
    }
}
