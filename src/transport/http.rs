use super::{
    default_headers, endpoint_url, parse_base_url, AsyncResponse, AsyncTransport, HttpRequest,
    RequestBody, TransportError, BLOB_CHUNK_SIZE,
};
use crate::client::ClientConfig;
use crate::{Error, Result};
use futures::TryStreamExt;
use reqwest::redirect::Policy;
use reqwest::Proxy;
use tokio_util::codec::{BytesCodec, FramedRead};

/// Async transport backed by `reqwest::Client`.
///
/// Connection pooling, TLS and redirects are reqwest's business; this type only
/// maps [`HttpRequest`] onto it.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: url::Url,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .default_headers(default_headers(&config.headers)?)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .redirect(if config.follow_redirects {
                Policy::default()
            } else {
                Policy::none()
            });

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
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

#[async_trait::async_trait]
impl AsyncTransport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<AsyncResponse> {
        let url = endpoint_url(&self.base_url, &request.path)?;
        let mut req = self.client.request(request.method, url);

        req = match request.body {
            RequestBody::Empty => req,
            RequestBody::Json(bytes) => req.body(bytes),
            RequestBody::File(path) => {
                let file = tokio::fs::File::open(&path).await?;
                let chunks = FramedRead::with_capacity(file, BytesCodec::new(), BLOB_CHUNK_SIZE);
                req.body(reqwest::Body::wrap_stream(chunks))
            }
        };

        let resp = req
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;
        let status = resp.status().as_u16();

        let body = resp
            .bytes_stream()
            .map_err(|e| Error::Transport(TransportError::Http(e)));

        Ok(AsyncResponse {
            status,
            body: Box::pin(body),
        })
    }
}
