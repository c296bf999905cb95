//! Single-producer/single-consumer byte pipe.

use bytes::Bytes;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;

/// Soft bound on queued buffers. The producer blocks once reached; the
/// demultiplexer reads from a socket, so this is the only flow control
/// the raw-stream path needs.
const CAPACITY: usize = 256;

/// Error returned when writing to a pipe whose reader is gone.
#[derive(Debug, Error)]
#[error("pipe closed by consumer")]
pub struct PipeClosed;

/// Creates a connected pipe pair.
#[must_use]
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::channel(CAPACITY);
    (
        PipeWriter { tx },
        PipeReader {
            rx,
            pending: Bytes::new(),
        },
    )
}

/// Producer side of a pipe.
///
/// Dropping the writer marks end-of-stream: the reader drains whatever
/// is queued, then reports EOF.
#[derive(Debug, Clone)]
pub struct PipeWriter {
    tx: mpsc::Sender<Bytes>,
}

impl PipeWriter {
    /// Appends one buffer, blocking while the queue is at capacity.
    ///
    /// # Errors
    ///
    /// Returns [`PipeClosed`] once the reader has been dropped.
    pub async fn send(&self, data: Bytes) -> std::result::Result<(), PipeClosed> {
        self.tx.send(data).await.map_err(|_| PipeClosed)
    }
}

/// Consumer side of a pipe, readable as a byte stream.
///
/// Bytes come out one queued buffer at a time with standard partial-read
/// semantics. There is exactly one reader per pipe.
#[derive(Debug)]
pub struct PipeReader {
    rx: mpsc::Receiver<Bytes>,
    pending: Bytes,
}

impl AsyncRead for PipeReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if !this.pending.is_empty() {
                let n = this.pending.len().min(buf.remaining());
                buf.put_slice(&this.pending.split_to(n));
                return Poll::Ready(Ok(()));
            }
            match this.rx.poll_recv(cx) {
                Poll::Ready(Some(data)) => this.pending = data,
                Poll::Ready(None) => return Poll::Ready(Ok(())),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_delivers_buffers_in_order() {
        let (tx, mut rx) = pipe();
        tx.send(Bytes::from_static(b"hello ")).await.unwrap();
        tx.send(Bytes::from_static(b"world")).await.unwrap();
        drop(tx);

        let mut out = String::new();
        rx.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn test_partial_reads_drain_one_buffer() {
        let (tx, mut rx) = pipe();
        tx.send(Bytes::from_static(b"abcdef")).await.unwrap();

        let mut buf = [0u8; 4];
        rx.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"abcd");
        let mut rest = [0u8; 2];
        rx.read_exact(&mut rest).await.unwrap();
        assert_eq!(&rest, b"ef");
    }

    #[tokio::test]
    async fn test_drop_writer_signals_eof_after_drain() {
        let (tx, mut rx) = pipe();
        tx.send(Bytes::from_static(b"last")).await.unwrap();
        drop(tx);

        let mut out = Vec::new();
        rx.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"last");
    }

    #[tokio::test]
    async fn test_send_fails_after_reader_drop() {
        let (tx, rx) = pipe();
        drop(rx);
        let err = tx.send(Bytes::from_static(b"x")).await.unwrap_err();
        assert_eq!(err.to_string(), "pipe closed by consumer");
    }

    #[tokio::test]
    async fn test_empty_buffer_does_not_terminate() {
        let (tx, mut rx) = pipe();
        tx.send(Bytes::new()).await.unwrap();
        tx.send(Bytes::from_static(b"after-empty")).await.unwrap();
        drop(tx);

        let mut out = Vec::new();
        rx.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"after-empty");
    }
}
