//! Shared fixtures for integration tests.

#![allow(dead_code)]

use bytes::Bytes;
use ollama_lib_rust::transport::{
    AsyncResponse, AsyncTransport, BlockingResponse, BlockingTransport, HttpRequest, Method,
    RequestBody,
};
use ollama_lib_rust::{BlockingClient, Client, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Route library logs to the test harness (`RUST_LOG=ollama_lib_rust=debug`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory transport that records every request and answers with a canned response.
pub struct RecordingTransport {
    status: u16,
    body: Vec<u8>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Self::responding(200, b"{}")
    }

    pub fn responding(status: u16, body: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.to_vec(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: HttpRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

#[async_trait::async_trait]
impl AsyncTransport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> Result<AsyncResponse> {
        self.record(request);
        let chunk = Bytes::from(self.body.clone());
        Ok(AsyncResponse {
            status: self.status,
            body: Box::pin(futures::stream::iter(vec![Ok(chunk)])),
        })
    }
}

impl BlockingTransport for RecordingTransport {
    fn send(&self, request: HttpRequest) -> Result<BlockingResponse> {
        self.record(request);
        Ok(BlockingResponse {
            status: self.status,
            body: Box::new(std::io::Cursor::new(self.body.clone())),
        })
    }
}

/// In-memory blob store: `HEAD /api/blobs/<digest>` answers 404 until that blob
/// has been posted, 200 afterwards. Every other request gets 200 `{}`.
pub struct BlobStoreTransport {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    uploads: Mutex<Vec<String>>,
}

impl BlobStoreTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            blobs: Mutex::new(HashMap::new()),
            uploads: Mutex::new(Vec::new()),
        })
    }

    /// Blob paths in upload order, repeats included.
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn stored(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(path).cloned()
    }

    fn handle(&self, request: HttpRequest) -> (u16, Vec<u8>) {
        if !request.path.starts_with("/api/blobs/") {
            return (200, b"{}".to_vec());
        }
        if request.method == Method::HEAD {
            let status = if self.blobs.lock().unwrap().contains_key(&request.path) {
                200
            } else {
                404
            };
            return (status, Vec::new());
        }
        let contents = match &request.body {
            RequestBody::File(file) => std::fs::read(file).unwrap(),
            RequestBody::Json(bytes) => bytes.to_vec(),
            RequestBody::Empty => Vec::new(),
        };
        self.uploads.lock().unwrap().push(request.path.clone());
        self.blobs.lock().unwrap().insert(request.path, contents);
        (201, Vec::new())
    }
}

#[async_trait::async_trait]
impl AsyncTransport for BlobStoreTransport {
    async fn send(&self, request: HttpRequest) -> Result<AsyncResponse> {
        let (status, body) = self.handle(request);
        Ok(AsyncResponse {
            status,
            body: Box::pin(futures::stream::iter(vec![Ok(Bytes::from(body))])),
        })
    }
}

impl BlockingTransport for BlobStoreTransport {
    fn send(&self, request: HttpRequest) -> Result<BlockingResponse> {
        let (status, body) = self.handle(request);
        Ok(BlockingResponse {
            status,
            body: Box::new(std::io::Cursor::new(body)),
        })
    }
}

pub fn async_client(transport: &Arc<RecordingTransport>) -> Client {
    Client::builder()
        .transport(transport.clone())
        .build()
        .unwrap()
}

pub fn blocking_client(transport: &Arc<RecordingTransport>) -> BlockingClient {
    Client::builder()
        .blocking_transport(transport.clone())
        .build_blocking()
        .unwrap()
}

/// Newline-delimited JSON body from individual documents.
pub fn ndjson(lines: &[serde_json::Value]) -> String {
    lines.iter().map(|l| format!("{}\n", l)).collect()
}
