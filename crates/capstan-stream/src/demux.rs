//! Raw-stream demultiplexer.

use crate::pipe::PipeWriter;
use bytes::Bytes;
use capstan_transport::PushbackReader;
use std::io;
use tokio::io::AsyncRead;

/// Stream ids carried in byte 0 of the frame header.
const STREAM_STDIN: u8 = 0;
const STREAM_STDOUT: u8 = 1;
const STREAM_STDERR: u8 = 2;

/// Frame-decoding loop over the hijacked read half.
///
/// End-of-stream between frames terminates cleanly; a short read inside
/// a frame header or payload is an error. Payloads route to the sink
/// for their stream id; an absent sink discards. Stream id 0 is the
/// mirrored-stdin channel, which the daemon never emits, and is
/// discarded; anything above 2 is a protocol error.
///
/// The loop does not own the connection and never closes it. The pipes
/// close when the sinks drop on return.
pub(crate) async fn run<R>(
    mut src: PushbackReader<R>,
    stdout: Option<PipeWriter>,
    stderr: Option<PipeWriter>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    loop {
        let mut header = [0u8; 8];
        let n = src.read(&mut header[..1]).await?;
        if n == 0 {
            tracing::trace!("raw stream ended between frames");
            return Ok(());
        }
        src.read_exact(&mut header[1..])
            .await
            .map_err(|e| framing(&e, "frame header"))?;

        let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let mut payload = vec![0u8; len];
        src.read_exact(&mut payload)
            .await
            .map_err(|e| framing(&e, "frame payload"))?;

        let sink = match header[0] {
            STREAM_STDOUT => stdout.as_ref(),
            STREAM_STDERR => stderr.as_ref(),
            STREAM_STDIN => None,
            id => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown stream id {id} in frame header"),
                ));
            }
        };

        let Some(sink) = sink else {
            tracing::trace!(stream = header[0], len, "discarding frame without a sink");
            continue;
        };
        if sink.send(Bytes::from(payload)).await.is_err() {
            // Reader side is gone; no one is listening anymore.
            tracing::trace!(stream = header[0], "sink dropped, stopping demultiplexer");
            return Ok(());
        }
    }
}

fn framing(err: &io::Error, what: &str) -> io::Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("connection ended inside a {what}: {err}"),
        )
    } else {
        io::Error::new(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::pipe;
    use std::io::Cursor;
    use tokio::io::AsyncReadExt;

    fn frame(stream: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![stream, 0, 0, 0];
        out.extend_from_slice(&u32::try_from(payload.len()).unwrap().to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn reader_over(bytes: Vec<u8>) -> PushbackReader<Cursor<Vec<u8>>> {
        PushbackReader::new(Cursor::new(bytes))
    }

    #[tokio::test]
    async fn test_routes_frames_to_both_pipes() {
        let mut wire = frame(1, b"hello");
        wire.extend(frame(2, b"ERROR"));
        wire.extend(frame(1, b"!\n"));

        let (out_tx, mut out_rx) = pipe();
        let (err_tx, mut err_rx) = pipe();
        run(reader_over(wire), Some(out_tx), Some(err_tx))
            .await
            .unwrap();

        let mut stdout = Vec::new();
        out_rx.read_to_end(&mut stdout).await.unwrap();
        assert_eq!(stdout, b"hello!\n");

        let mut stderr = Vec::new();
        err_rx.read_to_end(&mut stderr).await.unwrap();
        assert_eq!(stderr, b"ERROR");
    }

    #[tokio::test]
    async fn test_merged_mode_interleaves_in_wire_order() {
        let mut wire = frame(1, b"a");
        wire.extend(frame(2, b"b"));
        wire.extend(frame(1, b"c"));

        let (tx, mut rx) = pipe();
        run(reader_over(wire), Some(tx.clone()), Some(tx))
            .await
            .unwrap();

        let mut merged = Vec::new();
        rx.read_to_end(&mut merged).await.unwrap();
        assert_eq!(merged, b"abc");
    }

    #[tokio::test]
    async fn test_discards_stdin_and_absent_sinks() {
        let mut wire = frame(0, b"mirrored");
        wire.extend(frame(2, b"dropped"));
        wire.extend(frame(1, b"kept"));

        let (tx, mut rx) = pipe();
        run(reader_over(wire), Some(tx), None).await.unwrap();

        let mut stdout = Vec::new();
        rx.read_to_end(&mut stdout).await.unwrap();
        assert_eq!(stdout, b"kept");
    }

    #[tokio::test]
    async fn test_unknown_stream_id_is_protocol_error() {
        let wire = frame(7, b"??");
        let (tx, _rx) = pipe();
        let err = run(reader_over(wire), Some(tx), None).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("stream id 7"));
    }

    #[tokio::test]
    async fn test_truncated_header_is_an_error() {
        let wire = vec![1u8, 0, 0];
        let (tx, _rx) = pipe();
        let err = run(reader_over(wire), Some(tx), None).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(err.to_string().contains("frame header"));
    }

    #[tokio::test]
    async fn test_truncated_payload_is_an_error() {
        let mut wire = vec![1u8, 0, 0, 0];
        wire.extend_from_slice(&5u32.to_be_bytes());
        wire.extend_from_slice(b"hi");
        let (tx, _rx) = pipe();
        let err = run(reader_over(wire), Some(tx), None).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(err.to_string().contains("frame payload"));
    }

    #[tokio::test]
    async fn test_empty_stream_terminates_cleanly() {
        let (tx, mut rx) = pipe();
        run(reader_over(Vec::new()), Some(tx), None).await.unwrap();
        let mut out = Vec::new();
        rx.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_zero_length_payload_frame() {
        let mut wire = frame(1, b"");
        wire.extend(frame(1, b"tail"));
        let (tx, mut rx) = pipe();
        run(reader_over(wire), Some(tx), None).await.unwrap();
        let mut out = Vec::new();
        rx.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"tail");
    }
}
