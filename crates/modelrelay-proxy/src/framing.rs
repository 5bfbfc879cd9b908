//! HTTP/1.1 request framing over a raw byte stream.
//!
//! Reads exactly one request off a connection: the request line, the header
//! block up to `\r\n\r\n`, and a body of exactly `Content-Length` bytes.
//! Reads may split the request at any byte boundary.
//!
//! Chunked request bodies are not supported: `Transfer-Encoding` is not
//! interpreted, and a request without `Content-Length` is treated as having
//! an empty body.

use std::io;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use modelrelay_core::RouterSettings;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const READ_CHUNK: usize = 8 * 1024;

/// Errors that end a connection without a response.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The peer closed the connection before a full header block arrived.
    #[error("Connection closed before the request headers were complete")]
    ConnectionClosed,

    /// The header block exceeded the configured limit.
    #[error("Request headers exceed {0} bytes")]
    HeadersTooLarge(usize),

    /// The request line is not `METHOD TARGET HTTP/x.y`.
    #[error("Malformed request line: {0:?}")]
    MalformedRequestLine(String),

    /// A header line has no colon, an empty name, or is not UTF-8.
    #[error("Malformed header line: {0:?}")]
    MalformedHeader(String),

    /// The declared body exceeds the configured limit.
    #[error("Declared body of {declared} bytes exceeds the {limit} byte limit")]
    BodyTooLarge { declared: usize, limit: usize },

    /// The peer closed the connection before the declared body arrived.
    #[error("Body incomplete: expected {expected} bytes, received {received}")]
    IncompleteBody { expected: usize, received: usize },

    /// Socket-level receive error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Size limits applied while framing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramingLimits {
    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
}

impl From<&RouterSettings> for FramingLimits {
    fn from(settings: &RouterSettings) -> Self {
        Self {
            max_header_bytes: settings.max_header_bytes,
            max_body_bytes: settings.max_body_bytes,
        }
    }
}

impl Default for FramingLimits {
    fn default() -> Self {
        Self::from(&RouterSettings::default())
    }
}

/// Ordered header list with case-insensitive lookup.
///
/// Names keep the spelling the client sent. Inserting a name that is already
/// present replaces the earlier value in place (last value wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A fully buffered inbound request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: String,
    /// Request target as sent, query string included.
    pub target: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl InboundRequest {
    /// The request target without its query string.
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }

    /// Declared body length; 0 when absent or unparsable.
    pub fn content_length(&self) -> usize {
        declared_length(&self.headers)
    }
}

fn declared_length(headers: &Headers) -> usize {
    headers
        .get("content-length")
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

fn find_terminator(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
        .map(|offset| from + offset)
}

/// Parse the request line and header lines (terminator excluded).
fn parse_head(head: &[u8]) -> Result<(String, String, Headers), FramingError> {
    let text = std::str::from_utf8(head)
        .map_err(|_| FramingError::MalformedHeader(String::from_utf8_lossy(head).into_owned()))?;
    let mut lines = text.split("\r\n");

    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(FramingError::MalformedRequestLine(request_line.to_string()));
    };
    if !version.starts_with("HTTP/1.") {
        return Err(FramingError::MalformedRequestLine(request_line.to_string()));
    }

    let mut headers = Headers::new();
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            return Err(FramingError::MalformedHeader(line.to_string()));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(FramingError::MalformedHeader(line.to_string()));
        }
        headers.insert(name, value.trim());
    }

    Ok((method.to_string(), target.to_string(), headers))
}

/// Read one request from `reader`.
///
/// Waits for the whole header block, then for exactly `Content-Length` body
/// bytes. Any bytes past the declared body are discarded (no pipelining).
pub async fn read_request<R>(
    reader: &mut R,
    limits: FramingLimits,
) -> Result<InboundRequest, FramingError>
where
    R: AsyncRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);
    let mut chunk = vec![0u8; READ_CHUNK];

    let head_end = loop {
        // A terminator may straddle two reads.
        let search_from = buf.len().saturating_sub(HEADER_TERMINATOR.len() - 1);
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(FramingError::ConnectionClosed);
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(pos) = find_terminator(&buf, search_from) {
            if pos > limits.max_header_bytes {
                return Err(FramingError::HeadersTooLarge(limits.max_header_bytes));
            }
            break pos;
        }
        if buf.len() > limits.max_header_bytes {
            return Err(FramingError::HeadersTooLarge(limits.max_header_bytes));
        }
    };

    let (method, target, headers) = parse_head(&buf[..head_end])?;

    let expected = declared_length(&headers);
    if expected > limits.max_body_bytes {
        return Err(FramingError::BodyTooLarge {
            declared: expected,
            limit: limits.max_body_bytes,
        });
    }

    let mut body = buf.split_off(head_end + HEADER_TERMINATOR.len());
    while body.len() < expected {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(FramingError::IncompleteBody {
                expected,
                received: body.len(),
            });
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(expected);

    Ok(InboundRequest {
        method,
        target,
        headers,
        body: Bytes::from(body),
    })
}
