//! Attach/exec sessions over a hijacked connection.

use crate::demux;
use crate::error::{Result, SessionError};
use crate::pipe::{pipe, PipeReader, PipeWriter};
use capstan_http::{codec, Request};
use capstan_transport::{ConnWriter, Connection};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;

/// Content type the daemon advertises on a successful upgrade.
pub const MULTIPLEXED_STREAM: &str = "application/vnd.docker.multiplexed-stream";

/// How stderr should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StderrMode {
    /// stderr is not requested.
    None,
    /// stderr arrives on its own reader.
    #[default]
    Separate,
    /// stderr frames are routed into the stdout reader.
    MergedWithStdout,
}

/// Which streams an attach/exec session carries.
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    pub stdin: bool,
    pub stdout: bool,
    pub stderr: StderrMode,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            stdin: false,
            stdout: true,
            stderr: StderrMode::Separate,
        }
    }
}

impl StreamConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_stdin(mut self, stdin: bool) -> Self {
        self.stdin = stdin;
        self
    }

    #[must_use]
    pub const fn with_stdout(mut self, stdout: bool) -> Self {
        self.stdout = stdout;
        self
    }

    #[must_use]
    pub const fn with_stderr(mut self, stderr: StderrMode) -> Self {
        self.stderr = stderr;
        self
    }

    /// Whether the daemon should be asked for stderr at all.
    #[must_use]
    pub fn wants_stderr(&self) -> bool {
        self.stderr != StderrMode::None
    }
}

/// A live attach/exec session on a hijacked connection.
///
/// Construction takes exclusive ownership of the connection: the
/// demultiplexer task holds the read half, and the write half doubles
/// as the container's stdin when requested. Any further HTTP request on
/// the same connection would be illegal, which the ownership transfer
/// makes unrepresentable.
pub struct StreamSession {
    writer: Option<ConnWriter>,
    stdin_requested: bool,
    stdout: Option<PipeReader>,
    stderr: Option<PipeReader>,
    demux: Option<JoinHandle<()>>,
}

impl StreamSession {
    /// Sends `req` as an upgrade handshake and hijacks the connection.
    ///
    /// The handshake headers (`connection: Upgrade`, `upgrade: tcp`,
    /// raw-stream content type, multiplexed-stream accept) are added
    /// here; the caller supplies path, query parameters, and body.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UpgradeRejected`] for any non-101
    /// response and [`SessionError::UnexpectedContentType`] when the
    /// daemon upgrades to something other than the multiplexed stream.
    pub async fn open(mut conn: Connection, req: Request, streams: StreamConfig) -> Result<Self> {
        let req = req
            .header("connection", "Upgrade")
            .header("upgrade", "tcp")
            .header("content-type", "application/vnd.docker.raw-stream")
            .header("accept", MULTIPLEXED_STREAM);

        let response = codec::request(&mut conn, req).await?;
        if response.status != 101 {
            return Err(SessionError::UpgradeRejected {
                status: response.status,
                message: response
                    .error_message()
                    .unwrap_or_else(|| "daemon refused the upgrade".to_string()),
            });
        }
        let content_type = response.header("content-type").unwrap_or_default();
        if content_type != MULTIPLEXED_STREAM {
            return Err(SessionError::UnexpectedContentType(content_type.to_string()));
        }

        let (read, write) = conn.split();

        let mut stdout_rx = None;
        let mut stderr_rx = None;
        let stdout_tx: Option<PipeWriter> = if streams.stdout {
            let (tx, rx) = pipe();
            stdout_rx = Some(rx);
            Some(tx)
        } else {
            None
        };
        let stderr_tx: Option<PipeWriter> = match streams.stderr {
            StderrMode::None => None,
            StderrMode::Separate => {
                let (tx, rx) = pipe();
                stderr_rx = Some(rx);
                Some(tx)
            }
            StderrMode::MergedWithStdout => stdout_tx.clone(),
        };

        let demux = tokio::spawn(async move {
            if let Err(e) = demux::run(read, stdout_tx, stderr_tx).await {
                tracing::debug!("raw-stream demultiplexer stopped: {e}");
            }
        });

        Ok(Self {
            writer: Some(write),
            stdin_requested: streams.stdin,
            stdout: stdout_rx,
            stderr: stderr_rx,
            demux: Some(demux),
        })
    }

    /// The container's stdin, when the session requested it.
    ///
    /// Writes go to the daemon in the order issued; the session performs
    /// no coalescing beyond the socket buffer.
    pub fn stdin(&mut self) -> Option<&mut ConnWriter> {
        if self.stdin_requested {
            self.writer.as_mut()
        } else {
            None
        }
    }

    /// Takes the stdout reader. A pipe has exactly one reader, so this
    /// can succeed once.
    pub fn take_stdout(&mut self) -> Option<PipeReader> {
        self.stdout.take()
    }

    /// Takes the stderr reader. `None` when stderr was not requested or
    /// is merged into stdout.
    pub fn take_stderr(&mut self) -> Option<PipeReader> {
        self.stderr.take()
    }

    /// Shuts the session down: cancels the demultiplexer, closes the
    /// exposed streams, and releases the connection.
    ///
    /// Closing an already-closed session is a no-op.
    pub async fn close(&mut self) {
        if let Some(task) = self.demux.take() {
            task.abort();
        }
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!("session close: write shutdown failed: {e}");
            }
        }
        drop(self.stdout.take());
        drop(self.stderr.take());
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if let Some(task) = self.demux.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("stdin", &self.stdin_requested)
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .field("running", &self.demux.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_transport::{Dialer, UnixDialer};
    use std::sync::Arc;
    use tokio::io::{duplex, split, AsyncReadExt, AsyncWriteExt as _};

    fn frame(stream: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![stream, 0, 0, 0];
        out.extend_from_slice(&u32::try_from(payload.len()).unwrap().to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// Scripted daemon end of an upgrade handshake.
    async fn upgraded_session(
        response_head: &str,
        frames: Vec<u8>,
        streams: StreamConfig,
    ) -> (Result<StreamSession>, tokio::task::JoinHandle<Vec<u8>>) {
        let (near, far) = duplex(64 * 1024);
        let (near_read, near_write) = split(near);
        let (mut far_read, mut far_write) = split(far);
        let dialer: Arc<dyn Dialer> = Arc::new(UnixDialer::new("/nonexistent.sock"));
        let conn = Connection::from_parts(
            Box::new(near_read),
            Box::new(near_write),
            "localhost",
            dialer,
        );

        let head = response_head.to_string();
        let server = tokio::spawn(async move {
            // Swallow the upgrade request head.
            let mut buf = vec![0u8; 4096];
            let _ = far_read.read(&mut buf).await.unwrap();
            far_write.write_all(head.as_bytes()).await.unwrap();
            far_write.write_all(&frames).await.unwrap();
            // Half-close so the demultiplexer sees EOF, then collect
            // whatever the caller writes as stdin.
            far_write.shutdown().await.unwrap();
            let mut stdin = Vec::new();
            far_read.read_to_end(&mut stdin).await.unwrap();
            stdin
        });

        let req = Request::post("/containers/abc/attach")
            .query("stream", true)
            .query("stdout", true);
        let session = StreamSession::open(conn, req, streams).await;
        (session, server)
    }

    const UPGRADE_HEAD: &str = "HTTP/1.1 101 UPGRADED\r\n\
        connection: Upgrade\r\nupgrade: tcp\r\n\
        content-type: application/vnd.docker.multiplexed-stream\r\n\r\n";

    #[tokio::test]
    async fn test_attach_separates_stdout_and_stderr() {
        let mut frames = frame(1, b"hello");
        frames.extend(frame(2, b"ERROR"));
        frames.extend(frame(1, b"!\n"));

        let (session, server) =
            upgraded_session(UPGRADE_HEAD, frames, StreamConfig::new().with_stdin(true)).await;
        let mut session = session.unwrap();

        let mut stdout = session.take_stdout().unwrap();
        let mut stderr = session.take_stderr().unwrap();

        let mut out = Vec::new();
        stdout.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello!\n");

        let mut err = Vec::new();
        stderr.read_to_end(&mut err).await.unwrap();
        assert_eq!(err, b"ERROR");

        let stdin = session.stdin().unwrap();
        stdin.write_all(b"ping\n").await.unwrap();
        stdin.flush().await.unwrap();
        session.close().await;

        assert_eq!(server.await.unwrap(), b"ping\n");
    }

    #[tokio::test]
    async fn test_merged_stderr_has_single_reader() {
        let mut frames = frame(1, b"a");
        frames.extend(frame(2, b"b"));

        let (session, _server) = upgraded_session(
            UPGRADE_HEAD,
            frames,
            StreamConfig::new().with_stderr(StderrMode::MergedWithStdout),
        )
        .await;
        let mut session = session.unwrap();

        assert!(session.take_stderr().is_none());
        let mut stdout = session.take_stdout().unwrap();
        let mut merged = Vec::new();
        stdout.read_to_end(&mut merged).await.unwrap();
        assert_eq!(merged, b"ab");
    }

    #[tokio::test]
    async fn test_stdin_absent_unless_requested() {
        let (session, _server) =
            upgraded_session(UPGRADE_HEAD, frame(1, b"x"), StreamConfig::new()).await;
        let mut session = session.unwrap();
        assert!(session.stdin().is_none());
    }

    #[tokio::test]
    async fn test_non_101_is_rejected() {
        let head = "HTTP/1.1 404 Not Found\r\n\
            content-type: application/json\r\ncontent-length: 31\r\n\r\n\
            {\"message\":\"no such container\"}";
        let (session, _server) = upgraded_session(head, Vec::new(), StreamConfig::new()).await;
        match session.unwrap_err() {
            SessionError::UpgradeRejected { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "no such container");
            }
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_rejected() {
        let head = "HTTP/1.1 101 UPGRADED\r\n\
            content-type: application/vnd.docker.raw-stream\r\n\r\n";
        let (session, _server) = upgraded_session(head, Vec::new(), StreamConfig::new()).await;
        assert!(matches!(
            session.unwrap_err(),
            SessionError::UnexpectedContentType(_)
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (session, _server) =
            upgraded_session(UPGRADE_HEAD, frame(1, b"x"), StreamConfig::new()).await;
        let mut session = session.unwrap();
        session.close().await;
        session.close().await;
    }
}
