//! Writing HTTP/1.1 responses the router synthesizes itself.

use std::io;

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::models::ErrorResponse;

/// Canonical reason phrase for a status code, empty when unknown.
pub fn reason_phrase(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("")
}

/// `HTTP/1.1 {status} {reason}\r\n`
pub fn status_line(status: u16) -> String {
    format!("HTTP/1.1 {status} {}\r\n", reason_phrase(status))
}

/// Write a complete JSON response and shut down the write side.
///
/// Returns the number of body bytes written.
pub async fn write_json_response<W, T>(writer: &mut W, status: u16, body: &T) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(body).map_err(io::Error::other)?;
    let head = format!(
        "{}Content-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status_line(status),
        payload.len()
    );
    writer.write_all(head.as_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    writer.shutdown().await?;
    Ok(payload.len() as u64)
}

/// Write an OpenAI-style error body with the given status.
pub async fn write_error_response<W>(
    writer: &mut W,
    status: u16,
    error: &ErrorResponse,
) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    write_json_response(writer, status, error).await
}
