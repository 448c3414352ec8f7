use super::{
    default_headers, endpoint_url, parse_base_url, BlockingResponse, BlockingTransport,
    HttpRequest, RequestBody, TransportError,
};
use crate::client::ClientConfig;
use crate::{Error, Result};
use reqwest::redirect::Policy;
use reqwest::Proxy;

/// Blocking transport backed by `reqwest::blocking::Client`.
///
/// reqwest runs its own internal runtime for this client, so it must not be
/// built or dropped from inside an async context.
pub struct BlockingHttpTransport {
    client: reqwest::blocking::Client,
    base_url: url::Url,
}

impl BlockingHttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .default_headers(default_headers(&config.headers)?)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            // None disables reqwest's 30s blocking default.
            .timeout(config.timeout)
            .redirect(if config.follow_redirects {
                Policy::default()
            } else {
                Policy::none()
            });

        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(proxy_url) = &config.proxy {
            let proxy = Proxy::all(proxy_url).map_err(TransportError::Http)?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(TransportError::Http)?;

        Ok(Self {
            client,
            base_url: parse_base_url(&config.target)?,
        })
    }

    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }
}

impl BlockingTransport for BlockingHttpTransport {
    fn send(&self, request: HttpRequest) -> Result<BlockingResponse> {
        let url = endpoint_url(&self.base_url, &request.path)?;
        let mut req = self.client.request(request.method, url);

        req = match request.body {
            RequestBody::Empty => req,
            RequestBody::Json(bytes) => req.body(bytes.to_vec()),
            RequestBody::File(path) => {
                let file = std::fs::File::open(&path)?;
                req.body(reqwest::blocking::Body::new(file))
            }
        };

        let resp = req
            .send()
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;
        let status = resp.status().as_u16();

        Ok(BlockingResponse {
            status,
            body: Box::new(resp),
        })
    }
}
