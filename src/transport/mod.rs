//! Transport seam: "send a request, receive status + body bytes".
//!
//! Everything above this module (request building, error translation, stream
//! decoding) is shared between the two clients. The two traits here differ only
//! in how they wait: [`AsyncTransport`] suspends on the caller's executor,
//! [`BlockingTransport`] parks the calling thread.

pub mod blocking;
pub mod http;

pub use blocking::BlockingHttpTransport;
pub use http::HttpTransport;

use crate::{BoxStream, Result};
use bytes::Bytes;
use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use std::io::Read;
use std::path::PathBuf;

pub use reqwest::Method;

/// Read size for blob hashing and streamed uploads.
pub const BLOB_CHUNK_SIZE: usize = 32 * 1024;

/// `ollama-lib-rust/<version> (<arch> <os>) Rust`
pub static CLIENT_USER_AGENT: Lazy<String> = Lazy::new(|| {
    format!(
        "ollama-lib-rust/{} ({} {}) Rust",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH,
        std::env::consts::OS
    )
});

/// Request body as it goes on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// Pre-serialized JSON, so both clients send identical bytes.
    Json(Bytes),
    /// Raw file contents, streamed from disk.
    File(PathBuf),
}

/// One HTTP exchange, relative to the client's target address.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Body bytes when the request carries JSON.
    pub fn json_bytes(&self) -> Option<&[u8]> {
        match &self.body {
            RequestBody::Json(b) => Some(b),
            _ => None,
        }
    }
}

/// Response whose body arrives as a byte stream.
pub struct AsyncResponse {
    pub status: u16,
    pub body: BoxStream<'static, Bytes>,
}

/// Response whose body is read on the calling thread.
pub struct BlockingResponse {
    pub status: u16,
    pub body: Box<dyn Read + Send>,
}

/// Cooperative (non-blocking) transport.
#[async_trait::async_trait]
pub trait AsyncTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<AsyncResponse>;
}

/// Thread-blocking transport.
pub trait BlockingTransport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<BlockingResponse>;
}

/// Headers attached to every request: JSON content type and accept, client identity,
/// then any caller-supplied extras (which may override the defaults).
pub(crate) fn default_headers(extra: &[(String, String)]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    let agent = HeaderValue::from_str(&CLIENT_USER_AGENT)
        .map_err(|e| TransportError::Other(format!("invalid user agent: {}", e)))?;
    headers.insert(USER_AGENT, agent);

    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::Other(format!("invalid header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::Other(format!("invalid header value for {}: {}", name, e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Join the target address and a request path into a full URL.
pub(crate) fn endpoint_url(base: &url::Url, path: &str) -> Result<url::Url> {
    base.join(path).map_err(|e| {
        crate::Error::Transport(TransportError::Other(format!(
            "invalid request path {}: {}",
            path, e
        )))
    })
}

pub(crate) fn parse_base_url(target: &crate::host::TargetAddress) -> Result<url::Url> {
    url::Url::parse(&target.to_string()).map_err(|e| {
        crate::Error::Transport(TransportError::Other(format!(
            "invalid target address {}: {}",
            target, e
        )))
    })
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
