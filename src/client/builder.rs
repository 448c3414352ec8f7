use super::config::{env_pool_max_idle, env_proxy, env_timeout, ClientConfig};
use super::{BlockingClient, Client};
use crate::host::TargetAddress;
use crate::transport::{AsyncTransport, BlockingHttpTransport, BlockingTransport, HttpTransport};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`Client`] and [`BlockingClient`].
///
/// Values set here win over the environment:
/// - `OLLAMA_HOST` (target address)
/// - `OLLAMA_HTTP_TIMEOUT_SECS` (request timeout, unset = none)
/// - `OLLAMA_HTTP_POOL_MAX_IDLE_PER_HOST` (default 32)
/// - `OLLAMA_PROXY_URL`
pub struct ClientBuilder {
    host: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    follow_redirects: bool,
    pool_max_idle_per_host: Option<usize>,
    proxy: Option<String>,
    headers: Vec<(String, String)>,
    transport: Option<Arc<dyn AsyncTransport>>,
    blocking_transport: Option<Arc<dyn BlockingTransport>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            host: None,
            timeout: None,
            connect_timeout: None,
            follow_redirects: true,
            pool_max_idle_per_host: None,
            proxy: None,
            headers: Vec::new(),
            transport: None,
            blocking_transport: None,
        }
    }

    /// Target address in any form accepted by [`TargetAddress::resolve`].
    /// An empty string counts as unset.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Whole-request timeout. Streams included, so leave unset for long generations.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn follow_redirects(mut self, enable: bool) -> Self {
        self.follow_redirects = enable;
        self
    }

    pub fn pool_max_idle_per_host(mut self, n: usize) -> Self {
        self.pool_max_idle_per_host = Some(n);
        self
    }

    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.proxy = Some(url.into());
        self
    }

    /// Extra header sent with every request. May override the defaults.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the HTTP transport of [`build`](Self::build) (primarily for testing).
    pub fn transport(mut self, transport: Arc<dyn AsyncTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the HTTP transport of [`build_blocking`](Self::build_blocking).
    pub fn blocking_transport(mut self, transport: Arc<dyn BlockingTransport>) -> Self {
        self.blocking_transport = Some(transport);
        self
    }

    /// Resolved settings: builder values first, then environment, then defaults.
    pub fn config(&self) -> ClientConfig {
        let target = match self.host.as_deref().filter(|h| !h.trim().is_empty()) {
            Some(host) => TargetAddress::resolve(Some(host)),
            None => TargetAddress::from_env(),
        };
        ClientConfig {
            target,
            timeout: self.timeout.or_else(env_timeout),
            connect_timeout: self.connect_timeout,
            follow_redirects: self.follow_redirects,
            pool_max_idle_per_host: self
                .pool_max_idle_per_host
                .unwrap_or_else(env_pool_max_idle),
            proxy: self.proxy.clone().or_else(env_proxy),
            headers: self.headers.clone(),
        }
    }

    /// Build the async client.
    pub fn build(self) -> Result<Client> {
        let config = self.config();
        let transport: Arc<dyn AsyncTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&config)?),
        };
        Ok(Client::from_parts(transport, config.target))
    }

    /// Build the blocking client.
    ///
    /// The default transport owns its own runtime, so call this outside of any
    /// async context.
    pub fn build_blocking(self) -> Result<BlockingClient> {
        let config = self.config();
        let transport: Arc<dyn BlockingTransport> = match self.blocking_transport {
            Some(transport) => transport,
            None => Arc::new(BlockingHttpTransport::new(&config)?),
        };
        Ok(BlockingClient::from_parts(transport, config.target))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_values_win() {
        let config = ClientBuilder::new()
            .host("https://models.internal")
            .timeout(Duration::from_secs(3))
            .pool_max_idle_per_host(4)
            .proxy("http://proxy:3128")
            .follow_redirects(false)
            .header("x-team", "ml")
            .config();

        assert_eq!(config.target.to_string(), "https://models.internal:443");
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.pool_max_idle_per_host, 4);
        assert_eq!(config.proxy.as_deref(), Some("http://proxy:3128"));
        assert!(!config.follow_redirects);
        assert_eq!(config.headers, vec![("x-team".to_string(), "ml".to_string())]);
    }

    #[test]
    fn empty_host_falls_back_to_environment() {
        std::env::set_var(crate::host::HOST_ENV, "remote.example:9999");
        let from_env = ClientBuilder::new().config().target;
        let empty = ClientBuilder::new().host("").config().target;
        let blank = ClientBuilder::new().host("  ").config().target;
        std::env::remove_var(crate::host::HOST_ENV);

        assert_eq!(from_env.to_string(), "http://remote.example:9999");
        assert_eq!(empty, from_env);
        assert_eq!(blank, from_env);
    }
}
