//! 协议核心：请求构建、参数校验与错误转换，与执行方式无关。
//!
//! # Protocol Core
//!
//! Everything the two clients have in common. Nothing in this module performs
//! I/O on the network; it turns caller arguments into [`Operation`]s and turns
//! status codes and bodies back into results or errors.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`request`] | Endpoint payloads and [`Operation`] builders |
//! | [`validation`] | Local argument checks that run before any I/O |
//!
//! Because both [`Client`](crate::Client) and [`BlockingClient`](crate::BlockingClient)
//! build their requests here, they send byte-identical payloads.

pub mod request;
pub mod validation;

pub use request::Operation;

use crate::{Error, Result};
use serde_json::Value;

pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Translate a non-2xx status into a service error. `body` is the full response body.
pub fn check_status(status: u16, body: &[u8]) -> Result<()> {
    if is_success(status) {
        return Ok(());
    }
    let text = String::from_utf8_lossy(body);
    Err(Error::response(&text, Some(status)))
}

/// Parse a successful unary body. An empty body (HEAD, delete, copy) is `null`.
pub fn parse_unary_body(body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(body)?)
}
