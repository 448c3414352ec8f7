use super::ClientBuilder;
use crate::blob::BlobDigest;
use crate::host::TargetAddress;
use crate::modelfile::ModelDefinition;
use crate::protocol::request::{self, CreateSource};
use crate::protocol::{is_success, parse_unary_body, Operation};
use crate::stream::BlockingMessageStream;
use crate::transport::{BlockingResponse, BlockingTransport};
use crate::types::request::{
    ChatRequest, CreateRequest, EmbedRequest, EmbeddingsRequest, GenerateRequest,
};
use crate::types::response::{ChatResponse, GenerateResponse, ProgressResponse, StatusResponse};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Thread-blocking counterpart of [`Client`](super::Client).
///
/// Same operations, same payloads, same errors; each call parks the calling
/// thread until the response (or, for streams, the next line) arrives.
#[derive(Clone)]
pub struct BlockingClient {
    transport: Arc<dyn BlockingTransport>,
    target: TargetAddress,
}

impl BlockingClient {
    pub fn new() -> Result<Self> {
        ClientBuilder::new().build_blocking()
    }

    pub(crate) fn from_parts(
        transport: Arc<dyn BlockingTransport>,
        target: TargetAddress,
    ) -> Self {
        Self { transport, target }
    }

    pub fn target(&self) -> &TargetAddress {
        &self.target
    }

    fn send(&self, op: &Operation) -> Result<(BlockingResponse, Instant)> {
        let start = Instant::now();
        debug!(
            method = %op.method,
            endpoint = op.path.as_str(),
            streaming = op.streaming,
            "ollama request"
        );
        let response = self.transport.send(op.to_http())?;
        Ok((response, start))
    }

    /// Drain a failure response into a service error.
    fn failure(&self, op: &Operation, status: u16, start: Instant, mut body: Box<dyn Read + Send>) -> Error {
        let mut raw = Vec::new();
        if let Err(e) = body.read_to_end(&mut raw) {
            return e.into();
        }
        warn!(
            http_status = status,
            endpoint = op.path.as_str(),
            duration_ms = start.elapsed().as_millis(),
            "ollama request failed"
        );
        Error::response(&String::from_utf8_lossy(&raw), Some(status))
    }

    /// Run a unary operation and return the parsed JSON body (`null` when empty).
    pub fn execute(&self, op: Operation) -> Result<Value> {
        let (response, start) = self.send(&op)?;
        let BlockingResponse { status, mut body } = response;
        if !is_success(status) {
            return Err(self.failure(&op, status, start, body));
        }
        let mut raw = Vec::new();
        body.read_to_end(&mut raw)?;
        parse_unary_body(&raw)
    }

    /// Run a streaming operation; see [`Client::execute_stream`](super::Client::execute_stream).
    pub fn execute_stream(&self, op: Operation) -> Result<BlockingMessageStream> {
        let (response, start) = self.send(&op)?;
        let BlockingResponse { status, body } = response;
        if !is_success(status) {
            return Err(self.failure(&op, status, start, body));
        }
        debug!(
            http_status = status,
            endpoint = op.path.as_str(),
            "ollama request started streaming"
        );
        Ok(BlockingMessageStream::new(body))
    }

    fn execute_as<T: DeserializeOwned>(&self, op: Operation) -> Result<T> {
        Ok(serde_json::from_value(self.execute(op)?)?)
    }

    pub fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse> {
        self.execute_as(request::generate(req, false)?)
    }

    pub fn generate_stream(&self, req: &GenerateRequest) -> Result<BlockingMessageStream> {
        self.execute_stream(request::generate(req, true)?)
    }

    pub fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        self.execute_as(request::chat(req, false)?)
    }

    pub fn chat_stream(&self, req: &ChatRequest) -> Result<BlockingMessageStream> {
        self.execute_stream(request::chat(req, true)?)
    }

    pub fn embed(&self, req: &EmbedRequest) -> Result<Value> {
        self.execute(request::embed(req)?)
    }

    pub fn embeddings(&self, req: &EmbeddingsRequest) -> Result<Value> {
        self.execute(request::embeddings(req)?)
    }

    pub fn pull(&self, model: &str, insecure: bool) -> Result<ProgressResponse> {
        self.execute_as(request::pull(model, insecure, false)?)
    }

    pub fn pull_stream(&self, model: &str, insecure: bool) -> Result<BlockingMessageStream> {
        self.execute_stream(request::pull(model, insecure, true)?)
    }

    pub fn push(&self, model: &str, insecure: bool) -> Result<ProgressResponse> {
        self.execute_as(request::push(model, insecure, false)?)
    }

    pub fn push_stream(&self, model: &str, insecure: bool) -> Result<BlockingMessageStream> {
        self.execute_stream(request::push(model, insecure, true)?)
    }

    pub fn create(&self, req: &CreateRequest) -> Result<ProgressResponse> {
        let modelfile = self.prepare_model_definition(req)?;
        self.execute_as(request::create(req, &modelfile, false)?)
    }

    pub fn create_stream(&self, req: &CreateRequest) -> Result<BlockingMessageStream> {
        let modelfile = self.prepare_model_definition(req)?;
        self.execute_stream(request::create(req, &modelfile, true)?)
    }

    fn prepare_model_definition(&self, req: &CreateRequest) -> Result<String> {
        let source = request::create_source(req)?;
        let text = match &source {
            CreateSource::File(path) => std::fs::read_to_string(path)?,
            CreateSource::Inline(text) => text.to_string(),
        };
        let base = source.base_dir();
        ModelDefinition::parse(&text, base.as_deref())?.rewrite_with(|path| self.create_blob(path))
    }

    /// See [`Client::create_blob`](super::Client::create_blob).
    pub fn create_blob(&self, path: impl AsRef<Path>) -> Result<BlobDigest> {
        let path = path.as_ref();
        let digest = BlobDigest::from_file(path)?;

        match self.execute(request::blob_probe(&digest)) {
            Ok(_) => {
                debug!(digest = %digest, "blob already present");
                return Ok(digest);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        self.execute(request::blob_upload(&digest, path))?;
        info!(digest = %digest, path = %path.display(), "blob uploaded");
        Ok(digest)
    }

    pub fn delete(&self, model: &str) -> Result<StatusResponse> {
        self.execute(request::delete(model)?)?;
        Ok(StatusResponse::success())
    }

    pub fn copy(&self, source: &str, destination: &str) -> Result<StatusResponse> {
        self.execute(request::copy(source, destination)?)?;
        Ok(StatusResponse::success())
    }

    pub fn list(&self) -> Result<Value> {
        self.execute(request::list())
    }

    pub fn show(&self, model: &str) -> Result<Value> {
        self.execute(request::show(model)?)
    }

    pub fn ps(&self) -> Result<Value> {
        self.execute(request::ps())
    }
}
