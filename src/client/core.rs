use super::ClientBuilder;
use crate::blob::BlobDigest;
use crate::host::TargetAddress;
use crate::modelfile::ModelDefinition;
use crate::protocol::request::{self, CreateSource};
use crate::protocol::{check_status, is_success, parse_unary_body, Operation};
use crate::stream::MessageStream;
use crate::transport::{AsyncResponse, AsyncTransport};
use crate::types::request::{
    ChatRequest, CreateRequest, EmbedRequest, EmbeddingsRequest, GenerateRequest,
};
use crate::types::response::{ChatResponse, GenerateResponse, ProgressResponse, StatusResponse};
use crate::{BoxStream, Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Async client. Cheap to clone; clones share the connection pool.
///
/// Every method validates its arguments before any I/O, so a usage error never
/// reaches the network.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn AsyncTransport>,
    target: TargetAddress,
}

impl Client {
    /// Client configured from the environment.
    pub fn new() -> Result<Self> {
        ClientBuilder::new().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(transport: Arc<dyn AsyncTransport>, target: TargetAddress) -> Self {
        Self { transport, target }
    }

    /// Resolved address every request goes to.
    pub fn target(&self) -> &TargetAddress {
        &self.target
    }

    async fn send(&self, op: &Operation) -> Result<(AsyncResponse, Instant)> {
        let start = Instant::now();
        debug!(
            method = %op.method,
            endpoint = op.path.as_str(),
            streaming = op.streaming,
            "ollama request"
        );
        let response = self.transport.send(op.to_http()).await?;
        Ok((response, start))
    }

    /// Run a unary operation and return the parsed JSON body (`null` when empty).
    pub async fn execute(&self, op: Operation) -> Result<Value> {
        let (response, start) = self.send(&op).await?;
        let status = response.status;
        let body = collect_body(response.body).await?;
        if let Err(e) = check_status(status, &body) {
            warn!(
                http_status = status,
                endpoint = op.path.as_str(),
                duration_ms = start.elapsed().as_millis(),
                "ollama request failed"
            );
            return Err(e);
        }
        parse_unary_body(&body)
    }

    /// Run a streaming operation. A failure status is reported here, before any
    /// message is produced; errors embedded in the stream surface while iterating.
    pub async fn execute_stream(&self, op: Operation) -> Result<MessageStream> {
        let (response, start) = self.send(&op).await?;
        let AsyncResponse { status, body } = response;
        if !is_success(status) {
            let body = collect_body(body).await?;
            warn!(
                http_status = status,
                endpoint = op.path.as_str(),
                duration_ms = start.elapsed().as_millis(),
                "ollama streaming request failed"
            );
            return Err(Error::response(&String::from_utf8_lossy(&body), Some(status)));
        }
        debug!(
            http_status = status,
            endpoint = op.path.as_str(),
            "ollama request started streaming"
        );
        Ok(MessageStream::new(body))
    }

    async fn execute_as<T: DeserializeOwned>(&self, op: Operation) -> Result<T> {
        Ok(serde_json::from_value(self.execute(op).await?)?)
    }

    pub async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse> {
        self.execute_as(request::generate(req, false)?).await
    }

    pub async fn generate_stream(&self, req: &GenerateRequest) -> Result<MessageStream> {
        self.execute_stream(request::generate(req, true)?).await
    }

    pub async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        self.execute_as(request::chat(req, false)?).await
    }

    pub async fn chat_stream(&self, req: &ChatRequest) -> Result<MessageStream> {
        self.execute_stream(request::chat(req, true)?).await
    }

    pub async fn embed(&self, req: &EmbedRequest) -> Result<Value> {
        self.execute(request::embed(req)?).await
    }

    pub async fn embeddings(&self, req: &EmbeddingsRequest) -> Result<Value> {
        self.execute(request::embeddings(req)?).await
    }

    pub async fn pull(&self, model: &str, insecure: bool) -> Result<ProgressResponse> {
        self.execute_as(request::pull(model, insecure, false)?).await
    }

    pub async fn pull_stream(&self, model: &str, insecure: bool) -> Result<MessageStream> {
        self.execute_stream(request::pull(model, insecure, true)?).await
    }

    pub async fn push(&self, model: &str, insecure: bool) -> Result<ProgressResponse> {
        self.execute_as(request::push(model, insecure, false)?).await
    }

    pub async fn push_stream(&self, model: &str, insecure: bool) -> Result<MessageStream> {
        self.execute_stream(request::push(model, insecure, true)?).await
    }

    /// Create a model. Local files named by `FROM`/`ADAPTER` are uploaded first.
    pub async fn create(&self, req: &CreateRequest) -> Result<ProgressResponse> {
        let modelfile = self.prepare_model_definition(req).await?;
        self.execute_as(request::create(req, &modelfile, false)?).await
    }

    pub async fn create_stream(&self, req: &CreateRequest) -> Result<MessageStream> {
        let modelfile = self.prepare_model_definition(req).await?;
        self.execute_stream(request::create(req, &modelfile, true)?).await
    }

    async fn prepare_model_definition(&self, req: &CreateRequest) -> Result<String> {
        let source = request::create_source(req)?;
        let text = match &source {
            CreateSource::File(path) => tokio::fs::read_to_string(path).await?,
            CreateSource::Inline(text) => text.to_string(),
        };
        let base = source.base_dir();
        let definition = ModelDefinition::parse(&text, base.as_deref())?;
        definition
            .rewrite_with_async(|path| self.create_blob(path))
            .await
    }

    /// Make sure the server holds the contents of `path`; return its digest.
    ///
    /// Idempotent: the file is uploaded only when the existence probe answers 404.
    /// Any other probe failure is returned as is.
    pub async fn create_blob(&self, path: impl AsRef<Path>) -> Result<BlobDigest> {
        let path = path.as_ref();
        let digest = BlobDigest::from_file_async(path).await?;

        match self.execute(request::blob_probe(&digest)).await {
            Ok(_) => {
                debug!(digest = %digest, "blob already present");
                return Ok(digest);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        self.execute(request::blob_upload(&digest, path)).await?;
        info!(digest = %digest, path = %path.display(), "blob uploaded");
        Ok(digest)
    }

    pub async fn delete(&self, model: &str) -> Result<StatusResponse> {
        self.execute(request::delete(model)?).await?;
        Ok(StatusResponse::success())
    }

    pub async fn copy(&self, source: &str, destination: &str) -> Result<StatusResponse> {
        self.execute(request::copy(source, destination)?).await?;
        Ok(StatusResponse::success())
    }

    /// Locally available models.
    pub async fn list(&self) -> Result<Value> {
        self.execute(request::list()).await
    }

    pub async fn show(&self, model: &str) -> Result<Value> {
        self.execute(request::show(model)?).await
    }

    /// Models currently loaded.
    pub async fn ps(&self) -> Result<Value> {
        self.execute(request::ps()).await
    }
}

async fn collect_body(body: BoxStream<'static, Bytes>) -> Result<Vec<u8>> {
    body.try_fold(Vec::new(), |mut acc, chunk| async move {
        acc.extend_from_slice(&chunk);
        Ok(acc)
    })
    .await
}
