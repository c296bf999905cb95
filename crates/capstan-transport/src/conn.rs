//! Daemon connections.

use crate::dial::{BoxedRead, BoxedWrite, Dialer};
use crate::error::Result;
use crate::read::PushbackReader;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Push-back capable read half of a [`Connection`].
pub type ConnReader = PushbackReader<BoxedRead>;

/// Buffered write half of a [`Connection`].
pub type ConnWriter = BufWriter<BoxedWrite>;

/// A dialed socket with buffered halves.
///
/// A connection is exclusively owned by whoever holds it and carries at
/// most one in-flight HTTP request. After a protocol upgrade the halves
/// are taken apart with [`Connection::split`] and no further HTTP
/// framing applies.
pub struct Connection {
    read: ConnReader,
    write: ConnWriter,
    host: String,
    dialer: Arc<dyn Dialer>,
}

impl Connection {
    /// Dials a new connection from the given client template.
    ///
    /// # Errors
    ///
    /// Returns an error if the dialer cannot open a socket.
    pub async fn dial(dialer: Arc<dyn Dialer>) -> Result<Self> {
        let (read, write) = dialer.dial().await?;
        let host = dialer.host().to_string();
        Ok(Self {
            read: PushbackReader::new(read),
            write: BufWriter::new(write),
            host,
            dialer,
        })
    }

    /// Wraps pre-connected halves, e.g. an in-memory stream pair.
    ///
    /// `dialer` remains the template for [`Connection::sibling`].
    pub fn from_parts(
        read: BoxedRead,
        write: BoxedWrite,
        host: impl Into<String>,
        dialer: Arc<dyn Dialer>,
    ) -> Self {
        Self {
            read: PushbackReader::new(read),
            write: BufWriter::new(write),
            host: host.into(),
            dialer,
        }
    }

    /// Dials a fresh sibling connection from the same client template.
    ///
    /// Needed because a hijacked connection can no longer serve HTTP
    /// requests; the caller's primary connection stays usable while the
    /// sibling carries the upgrade.
    ///
    /// # Errors
    ///
    /// Returns an error if the dialer cannot open a socket.
    pub async fn sibling(&self) -> Result<Self> {
        Self::dial(Arc::clone(&self.dialer)).await
    }

    /// Logical host used for the `host` request header.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The read half.
    pub fn reader(&mut self) -> &mut ConnReader {
        &mut self.read
    }

    /// The write half.
    pub fn writer(&mut self) -> &mut ConnWriter {
        &mut self.write
    }

    /// Takes the connection apart for a hijacked session: the
    /// demultiplexer owns the read half, the caller the write half.
    #[must_use]
    pub fn split(self) -> (ConnReader, ConnWriter) {
        (self.read, self.write)
    }

    /// Closes both halves. Each teardown step is guarded so a failure on
    /// one side still releases the other.
    pub async fn close(mut self) {
        if let Err(e) = self.write.shutdown().await {
            tracing::debug!("connection close: write shutdown failed: {e}");
        }
        drop(self.read);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.host)
            .field("buffered", &self.read.buffered())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dial::UnixDialer;
    use tokio::io::{AsyncReadExt, AsyncWriteExt as _};
    use tokio::net::UnixListener;

    #[tokio::test]
    async fn test_dial_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).await.unwrap();
            buf
        });

        let dialer: Arc<dyn Dialer> = Arc::new(UnixDialer::new(&path));
        let mut conn = Connection::dial(dialer).await.unwrap();
        assert_eq!(conn.host(), "localhost");

        conn.writer().write_all(b"ping").await.unwrap();
        conn.close().await;
        assert_eq!(server.await.unwrap(), b"ping");
    }

    #[tokio::test]
    async fn test_sibling_dials_same_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let mut accepted = 0;
            while accepted < 2 {
                let (_stream, _) = listener.accept().await.unwrap();
                accepted += 1;
            }
            accepted
        });

        let dialer: Arc<dyn Dialer> = Arc::new(UnixDialer::new(&path));
        let first = Connection::dial(dialer).await.unwrap();
        let second = first.sibling().await.unwrap();
        assert_eq!(second.host(), first.host());
        assert_eq!(server.await.unwrap(), 2);
    }
}
