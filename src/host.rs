//! Host resolution: turn a user-supplied address into a canonical `scheme://host:port`.
//!
//! Resolution never fails. Anything that cannot be parsed falls back to the
//! defaults, with the precedence explicit port > scheme default > service default.

use std::fmt;

/// Host used when none is given.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// The service's conventional port.
pub const DEFAULT_PORT: u16 = 11434;
/// Environment variable consulted when the caller does not supply a host.
pub const HOST_ENV: &str = "OLLAMA_HOST";

/// Canonical target of every request a client issues.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetAddress {
    scheme: String,
    host: String,
    port: u16,
}

impl TargetAddress {
    /// Resolve a raw host string. `None` and `""` are equivalent.
    pub fn resolve(raw: Option<&str>) -> Self {
        let raw = raw.unwrap_or("").trim();

        let (scheme, hostport, default_port) = match raw.split_once("://") {
            Some((scheme, rest)) => {
                let port = match scheme {
                    "http" => 80,
                    "https" => 443,
                    _ => DEFAULT_PORT,
                };
                (scheme, rest, port)
            }
            None => ("http", raw, DEFAULT_PORT),
        };

        let (host, port) = split_host_port(hostport);
        let host = match host {
            Some(h) if !h.is_empty() => h.to_ascii_lowercase(),
            _ => DEFAULT_HOST.to_string(),
        };
        let port = port.unwrap_or(default_port);

        Self {
            scheme: scheme.to_string(),
            host,
            port,
        }
    }

    /// Resolve from the `OLLAMA_HOST` environment variable.
    pub fn from_env() -> Self {
        let value = std::env::var(HOST_ENV).ok();
        Self::resolve(value.as_deref())
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for TargetAddress {
    fn default() -> Self {
        Self::resolve(None)
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Split the authority part of an address into host and explicit port.
///
/// Any path, query or fragment is dropped, as is userinfo. Bracketed IPv6
/// literals keep their brackets.
fn split_host_port(hostport: &str) -> (Option<&str>, Option<u16>) {
    let end = hostport.find(['/', '?', '#']).unwrap_or(hostport.len());
    let authority = &hostport[..end];
    let authority = match authority.rsplit_once('@') {
        Some((_, rest)) => rest,
        None => authority,
    };

    if authority.starts_with('[') {
        return match authority.find(']') {
            Some(close) => {
                let host = &authority[..=close];
                let port = authority[close + 1..]
                    .strip_prefix(':')
                    .and_then(parse_port);
                (Some(host), port)
            }
            None => (None, None),
        };
    }

    match authority.split_once(':') {
        Some((host, port)) => (Some(host), parse_port(port)),
        None => (Some(authority), None),
    }
}

fn parse_port(s: &str) -> Option<u16> {
    s.parse::<u16>().ok().filter(|p| *p != 0)
}
