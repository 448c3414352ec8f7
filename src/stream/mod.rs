//! 流式响应解码：逐行解析 NDJSON。
//!
//! Line-delimited JSON response decoding.
//!
//! A streaming response body is a sequence of JSON objects, one per line. The
//! server may answer HTTP 200 and still fail half-way through; it signals that
//! with an object carrying an `error` field. Decoding rules, shared by both
//! execution styles:
//!
//! - lines are split on `\n`, a trailing `\r` is dropped, blank lines are skipped;
//! - every other line must be a JSON object, otherwise decoding fails;
//! - an object with a non-empty `error` field (not `null`, `false`, `0`, `""`,
//!   `[]` or `{}`) ends the stream with
//!   [`Error::Response`](crate::Error::Response) (no status code);
//! - after any error the stream yields nothing more;
//! - end of body ends the stream normally.
//!
//! [`MessageStream`] drives this on an async byte stream, [`BlockingMessageStream`]
//! on a blocking reader.

mod async_stream;
mod blocking;

pub use async_stream::MessageStream;
pub use blocking::BlockingMessageStream;

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One decoded line of a streaming response.
///
/// Fields are kept as-is; typed views are available through [`StreamMessage::parse`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamMessage(Map<String, Value>);

impl StreamMessage {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn status(&self) -> Option<&str> {
        self.get("status").and_then(Value::as_str)
    }

    pub fn digest(&self) -> Option<&str> {
        self.get("digest").and_then(Value::as_str)
    }

    pub fn total(&self) -> Option<u64> {
        self.get("total").and_then(Value::as_u64)
    }

    pub fn completed(&self) -> Option<u64> {
        self.get("completed").and_then(Value::as_u64)
    }

    /// `done: true` marks the last message of generate/chat streams.
    pub fn is_done(&self) -> bool {
        self.get("done").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Text of an embedded `error` field. Empty values (`null`, `false`, `0`,
    /// `""`, `[]`, `{}`) do not count.
    pub fn error(&self) -> Option<String> {
        match self.get("error")? {
            Value::Null | Value::Bool(false) => None,
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::String(s) if s.is_empty() => None,
            Value::Array(a) if a.is_empty() => None,
            Value::Object(o) if o.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Deserialize into a typed response, e.g. [`ProgressResponse`](crate::ProgressResponse).
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.0.clone()))?)
    }
}

impl From<Map<String, Value>> for StreamMessage {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Decode one physical line. `Ok(None)` means the line was blank.
pub(crate) fn decode_line(line: &[u8]) -> Result<Option<StreamMessage>> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let map: Map<String, Value> = serde_json::from_slice(line)?;
    let message = StreamMessage(map);
    if let Some(error) = message.error() {
        return Err(Error::Response {
            message: error,
            status_code: None,
        });
    }
    Ok(Some(message))
}

/// Accumulates raw body bytes and hands out complete lines.
///
/// Bytes stay raw until a full line is present, so UTF-8 sequences split across
/// network chunks are never mangled.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Next complete line, terminator included.
    pub(crate) fn next_line(&mut self) -> Option<Vec<u8>> {
        let idx = self.buf.iter().position(|b| *b == b'\n')?;
        let rest = self.buf.split_off(idx + 1);
        Some(std::mem::replace(&mut self.buf, rest))
    }

    /// Whatever is left once the body has ended.
    pub(crate) fn take_remaining(&mut self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}
