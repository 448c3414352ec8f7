//! Resolved client settings shared by both transports.

use crate::host::TargetAddress;
use std::env;
use std::time::Duration;

/// Request timeout override, in seconds. Unset means no timeout.
pub const TIMEOUT_ENV: &str = "OLLAMA_HTTP_TIMEOUT_SECS";
/// Idle connections kept per host.
pub const POOL_MAX_IDLE_ENV: &str = "OLLAMA_HTTP_POOL_MAX_IDLE_PER_HOST";
/// Proxy applied to all schemes.
pub const PROXY_ENV: &str = "OLLAMA_PROXY_URL";

const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 32;

/// Everything a transport needs to be built. Produced by
/// [`ClientBuilder`](crate::client::ClientBuilder); explicit builder values win
/// over environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub target: TargetAddress,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub follow_redirects: bool,
    pub pool_max_idle_per_host: usize,
    pub proxy: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl ClientConfig {
    /// Settings from the environment alone.
    pub fn from_env() -> Self {
        Self {
            target: TargetAddress::from_env(),
            timeout: env_timeout(),
            connect_timeout: None,
            follow_redirects: true,
            pool_max_idle_per_host: env_pool_max_idle(),
            proxy: env_proxy(),
            headers: Vec::new(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            target: TargetAddress::default(),
            timeout: None,
            connect_timeout: None,
            follow_redirects: true,
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            proxy: None,
            headers: Vec::new(),
        }
    }
}

pub(crate) fn env_timeout() -> Option<Duration> {
    env::var(TIMEOUT_ENV)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

pub(crate) fn env_pool_max_idle() -> usize {
    env::var(POOL_MAX_IDLE_ENV)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_POOL_MAX_IDLE_PER_HOST)
}

pub(crate) fn env_proxy() -> Option<String> {
    env::var(PROXY_ENV).ok().filter(|s| !s.trim().is_empty())
}
