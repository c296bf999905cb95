//! Wire-level request writer and response parser.

use crate::error::{HttpError, Result};
use crate::names;
use crate::request::{Body, Method, QueryValue, Request};
use crate::response::{Response, ResponseBody};
use capstan_transport::{ChunkedReader, ChunkedWriter, Connection, Dialer, LimitedReader};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read as _;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Version prefix applied to every daemon endpoint path.
pub const API_PREFIX: &str = "/v1.46";

/// Upper bound for a status or header line.
const MAX_LINE: usize = 16 * 1024;

/// Copy granularity for streamed request bodies.
const COPY_BUF: usize = 8 * 1024;

/// Writes `req` to the connection.
///
/// The path gains the [`API_PREFIX`]; query values are URL-encoded per
/// their type. When a body is present the writer unconditionally adds
/// `transfer-encoding: chunked`, plus a JSON `content-type` for
/// structured bodies. A `host` header derived from the connection is
/// appended only when the caller did not set one.
///
/// # Errors
///
/// Returns an error on socket I/O failure or unserializable bodies.
pub async fn write_request(conn: &mut Connection, req: Request) -> Result<()> {
    let mut head = String::with_capacity(256);
    head.push_str(req.method.as_str());
    head.push(' ');
    head.push_str(API_PREFIX);
    head.push_str(&req.path);
    if !req.query.is_empty() {
        head.push('?');
        encode_query(&mut head, &req.query)?;
    }
    head.push_str(" HTTP/1.1\r\n");

    for (name, value) in &req.headers {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    if req.body.is_some() {
        head.push_str("transfer-encoding: chunked\r\n");
        if matches!(req.body, Some(Body::Json(_))) {
            head.push_str("content-type: application/json; charset=utf-8\r\n");
        }
    }
    if !req.has_header("host") {
        head.push_str("host: ");
        head.push_str(conn.host());
        head.push_str("\r\n");
    }
    head.push_str("\r\n");

    tracing::trace!(method = %req.method, path = %req.path, "writing request");
    conn.writer().write_all(head.as_bytes()).await?;

    if let Some(body) = req.body {
        let mut chunks = ChunkedWriter::new(conn.writer());
        match body {
            Body::Json(value) => {
                let encoded = serde_json::to_vec(&names::to_docker(&value))?;
                chunks.write_all(&encoded).await?;
            }
            Body::Text(text) => chunks.write_all(text.as_bytes()).await?,
            Body::Bytes(bytes) => chunks.write_all(&bytes).await?,
            Body::Reader(mut reader) => {
                let mut buf = [0u8; COPY_BUF];
                loop {
                    let n = reader.read(&mut buf).await?;
                    if n == 0 {
                        break;
                    }
                    chunks.write_all(&buf[..n]).await?;
                }
            }
        }
        chunks.finish().await?;
    }

    conn.writer().flush().await?;
    Ok(())
}

fn encode_query(out: &mut String, query: &[(String, QueryValue)]) -> Result<()> {
    for (i, (key, value)) in query.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        out.push_str(&urlencoding::encode(key));
        out.push('=');
        match value {
            QueryValue::Str(s) => out.push_str(&urlencoding::encode(s)),
            QueryValue::Int(n) => out.push_str(&n.to_string()),
            QueryValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            QueryValue::Json(v) => {
                let json = serde_json::to_string(v)?;
                out.push_str(&urlencoding::encode(&json));
            }
        }
    }
    Ok(())
}

/// Reads one response from the connection.
///
/// `json_seq` selects the streaming JSON decode for `application/json`
/// bodies; `head` suppresses body reading for HEAD responses. On return
/// the stream is positioned exactly one byte past the body, including
/// when the daemon appended its spurious trailing empty chunk.
///
/// # Errors
///
/// Returns a protocol error for malformed status lines, headers, or
/// body framing, and an I/O error when the socket fails.
pub async fn read_response(conn: &mut Connection, json_seq: bool, head: bool) -> Result<Response> {
    let status = read_status_line(conn).await?;
    let headers = read_headers(conn).await?;
    tracing::trace!(status, "read response head");

    // 101 hands the socket over to a raw stream; there is no body.
    if status == 101 || head {
        return Ok(Response {
            status,
            headers,
            body: ResponseBody::None,
        });
    }

    let raw = read_body(conn, &headers).await?;
    let raw = decompress(&headers, raw)?;
    let body = decode_body(&headers, raw, json_seq)?;
    Ok(Response {
        status,
        headers,
        body,
    })
}

async fn read_status_line(conn: &mut Connection) -> Result<u16> {
    loop {
        let line = conn.reader().read_line(MAX_LINE).await?;
        let trimmed = trim_crlf(&line);

        // Terminal chunk leaked from the previous response's quirk:
        // swallow "0" plus its blank line and retry.
        if trimmed == b"0" {
            let blank = conn.reader().read_line(MAX_LINE).await?;
            if !trim_crlf(&blank).is_empty() {
                return Err(HttpError::protocol(format!(
                    "expected blank line after leaked empty chunk, got {:?}",
                    String::from_utf8_lossy(&blank)
                )));
            }
            continue;
        }

        let text = std::str::from_utf8(trimmed)
            .map_err(|_| HttpError::protocol("status line is not UTF-8"))?;
        let rest = text.strip_prefix("HTTP/1.1 ").ok_or_else(|| {
            HttpError::protocol(format!("malformed status line: {text:?}"))
        })?;
        let code = rest
            .split(' ')
            .next()
            .ok_or_else(|| HttpError::protocol(format!("malformed status line: {text:?}")))?;
        return code
            .parse()
            .map_err(|_| HttpError::protocol(format!("malformed status code: {text:?}")));
    }
}

async fn read_headers(conn: &mut Connection) -> Result<HashMap<String, String>> {
    let mut headers = HashMap::new();
    loop {
        let line = conn.reader().read_line(MAX_LINE).await?;
        let trimmed = trim_crlf(&line);
        if trimmed.is_empty() {
            return Ok(headers);
        }
        let text = std::str::from_utf8(trimmed)
            .map_err(|_| HttpError::protocol("header line is not UTF-8"))?;
        let (name, value) = text.split_once(':').ok_or_else(|| {
            HttpError::protocol(format!("malformed header line: {text:?}"))
        })?;
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }
}

async fn read_body(conn: &mut Connection, headers: &HashMap<String, String>) -> Result<Vec<u8>> {
    let chunked = headers
        .get("transfer-encoding")
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));
    if chunked {
        return Ok(ChunkedReader::new(conn.reader()).read_to_end().await?);
    }

    let len = headers
        .get("content-length")
        .map(|v| v.parse::<u64>())
        .transpose()
        .map_err(|_| HttpError::protocol("malformed content-length header"))?
        .unwrap_or(0);
    if len == 0 {
        return Ok(Vec::new());
    }
    Ok(LimitedReader::new(conn.reader(), len).read_to_end().await?)
}

fn decompress(headers: &HashMap<String, String>, raw: Vec<u8>) -> Result<Vec<u8>> {
    let gzipped = headers
        .get("content-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("gzip"));
    if !gzipped {
        return Ok(raw);
    }
    let mut out = Vec::new();
    flate2::read::GzDecoder::new(raw.as_slice())
        .read_to_end(&mut out)
        .map_err(|e| HttpError::protocol(format!("gzip body: {e}")))?;
    Ok(out)
}

fn decode_body(
    headers: &HashMap<String, String>,
    raw: Vec<u8>,
    json_seq: bool,
) -> Result<ResponseBody> {
    if raw.is_empty() {
        return Ok(ResponseBody::None);
    }
    let content_type = headers.get("content-type").map_or("", String::as_str);

    if content_type.starts_with("application/json") {
        if json_seq {
            let mut values = Vec::new();
            for item in serde_json::Deserializer::from_slice(&raw).into_iter::<Value>() {
                values.push(names::from_docker(&item?));
            }
            return Ok(ResponseBody::JsonSeq(values));
        }
        let value: Value = serde_json::from_slice(&raw)?;
        return Ok(ResponseBody::Json(names::from_docker(&value)));
    }
    if content_type.starts_with("text/plain") {
        return String::from_utf8(raw)
            .map(ResponseBody::Text)
            .map_err(|_| HttpError::protocol("text body is not valid UTF-8"));
    }
    Ok(ResponseBody::Bytes(raw))
}

fn trim_crlf(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Writes the request and reads its response on the same connection.
///
/// The connection stays with the caller and is never closed here, even
/// on error.
///
/// # Errors
///
/// Propagates any write or parse failure.
pub async fn request(conn: &mut Connection, req: Request) -> Result<Response> {
    let json_seq = req.json_seq;
    let head = req.method == Method::Head;
    write_request(conn, req).await?;
    read_response(conn, json_seq, head).await
}

/// Runs one request over `conn` when given, or over a short-lived
/// connection dialed from `dialer` otherwise.
///
/// A caller-supplied connection is left open; the short-lived one is
/// closed before returning.
///
/// # Errors
///
/// Propagates dial, write, and parse failures.
pub async fn simple_request(
    dialer: &Arc<dyn Dialer>,
    conn: Option<&mut Connection>,
    req: Request,
) -> Result<Response> {
    match conn {
        Some(conn) => request(conn, req).await,
        None => {
            let mut conn = Connection::dial(Arc::clone(dialer)).await?;
            let response = request(&mut conn, req).await;
            conn.close().await;
            response
        }
    }
}
