//! Endpoint payloads and operation builders.
//!
//! Each builder validates its arguments, copies what it needs out of the
//! caller's request (images are base64-encoded in the copy, never in place),
//! and serializes the payload once.

use super::validation::require_model;
use crate::blob::BlobDigest;
use crate::transport::{HttpRequest, Method, RequestBody};
use crate::types::request::{
    ChatRequest, CreateRequest, EmbedInput, EmbedRequest, EmbeddingsRequest, Format,
    GenerateRequest, KeepAlive, Message, Options, Role, ToolCall,
};
use crate::types::ImageInput;
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// One logical call: where to send it, what to send, and whether the response
/// is a single JSON document or a line-delimited stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
    pub streaming: bool,
}

impl Operation {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::Empty,
            streaming: false,
        }
    }

    pub fn with_json<T: Serialize>(mut self, payload: &T) -> Result<Self> {
        self.body = RequestBody::Json(Bytes::from(serde_json::to_vec(payload)?));
        Ok(self)
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn to_http(&self) -> HttpRequest {
        HttpRequest::new(self.method.clone(), self.path.clone()).with_body(self.body.clone())
    }
}

#[derive(Serialize)]
struct GeneratePayload<'a> {
    model: &'a str,
    prompt: &'a str,
    suffix: &'a str,
    system: &'a str,
    template: &'a str,
    context: &'a [i64],
    stream: bool,
    raw: bool,
    images: Vec<String>,
    format: Format,
    options: &'a Options,
    keep_alive: Option<&'a KeepAlive>,
}

/// Owned copy of a caller message with images already encoded.
#[derive(Serialize)]
struct WireMessage {
    role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall>,
}

#[derive(Serialize)]
struct ChatPayload<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    tools: &'a [Value],
    stream: bool,
    format: Format,
    options: &'a Options,
    keep_alive: Option<&'a KeepAlive>,
}

#[derive(Serialize)]
struct EmbedPayload<'a> {
    model: &'a str,
    input: &'a EmbedInput,
    truncate: bool,
    options: &'a Options,
    keep_alive: Option<&'a KeepAlive>,
}

#[derive(Serialize)]
struct EmbeddingsPayload<'a> {
    model: &'a str,
    prompt: &'a str,
    options: &'a Options,
    keep_alive: Option<&'a KeepAlive>,
}

#[derive(Serialize)]
struct TransferPayload<'a> {
    name: &'a str,
    insecure: bool,
    stream: bool,
}

#[derive(Serialize)]
struct CreatePayload<'a> {
    name: &'a str,
    modelfile: &'a str,
    stream: bool,
    quantize: Option<&'a str>,
}

#[derive(Serialize)]
struct NamePayload<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct CopyPayload<'a> {
    source: &'a str,
    destination: &'a str,
}

fn encode_images(images: &[ImageInput]) -> Result<Vec<String>> {
    images.iter().map(ImageInput::encode).collect()
}

impl WireMessage {
    fn copy_from(message: &Message) -> Result<Self> {
        let images = if message.images.is_empty() {
            None
        } else {
            Some(encode_images(&message.images)?)
        };
        Ok(Self {
            role: message.role,
            content: message.content.clone(),
            images,
            tool_calls: message.tool_calls.clone(),
        })
    }
}

pub fn generate(request: &GenerateRequest, stream: bool) -> Result<Operation> {
    require_model(&request.model, "model")?;
    let payload = GeneratePayload {
        model: &request.model,
        prompt: &request.prompt,
        suffix: &request.suffix,
        system: &request.system,
        template: &request.template,
        context: &request.context,
        stream,
        raw: request.raw,
        images: encode_images(&request.images)?,
        format: request.format,
        options: &request.options,
        keep_alive: request.keep_alive.as_ref(),
    };
    Operation::new(Method::POST, "/api/generate")
        .with_json(&payload)
        .map(|op| op.streaming(stream))
}

pub fn chat(request: &ChatRequest, stream: bool) -> Result<Operation> {
    require_model(&request.model, "model")?;
    let messages = request
        .messages
        .iter()
        .map(WireMessage::copy_from)
        .collect::<Result<Vec<_>>>()?;
    let payload = ChatPayload {
        model: &request.model,
        messages,
        tools: &request.tools,
        stream,
        format: request.format,
        options: &request.options,
        keep_alive: request.keep_alive.as_ref(),
    };
    Operation::new(Method::POST, "/api/chat")
        .with_json(&payload)
        .map(|op| op.streaming(stream))
}

pub fn embed(request: &EmbedRequest) -> Result<Operation> {
    require_model(&request.model, "model")?;
    let payload = EmbedPayload {
        model: &request.model,
        input: &request.input,
        truncate: request.truncate,
        options: &request.options,
        keep_alive: request.keep_alive.as_ref(),
    };
    Operation::new(Method::POST, "/api/embed").with_json(&payload)
}

pub fn embeddings(request: &EmbeddingsRequest) -> Result<Operation> {
    require_model(&request.model, "model")?;
    let payload = EmbeddingsPayload {
        model: &request.model,
        prompt: &request.prompt,
        options: &request.options,
        keep_alive: request.keep_alive.as_ref(),
    };
    Operation::new(Method::POST, "/api/embeddings").with_json(&payload)
}

pub fn pull(model: &str, insecure: bool, stream: bool) -> Result<Operation> {
    transfer("/api/pull", model, insecure, stream)
}

pub fn push(model: &str, insecure: bool, stream: bool) -> Result<Operation> {
    transfer("/api/push", model, insecure, stream)
}

fn transfer(path: &str, model: &str, insecure: bool, stream: bool) -> Result<Operation> {
    require_model(model, "model")?;
    let payload = TransferPayload {
        name: model,
        insecure,
        stream,
    };
    Operation::new(Method::POST, path)
        .with_json(&payload)
        .map(|op| op.streaming(stream))
}

/// Where the model definition for `create` comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateSource<'a> {
    /// A file; relative references resolve against its directory.
    File(&'a Path),
    /// Inline text; relative references resolve against the current directory.
    Inline(&'a str),
}

impl CreateSource<'_> {
    /// Base directory for relative references (`None` = current directory).
    pub fn base_dir(&self) -> Option<PathBuf> {
        match self {
            CreateSource::File(path) => path.parent().map(Path::to_path_buf),
            CreateSource::Inline(_) => None,
        }
    }
}

/// Validate a create request and pick its definition source.
///
/// An existing file wins over inline text; having neither is a usage error.
pub fn create_source(request: &CreateRequest) -> Result<CreateSource<'_>> {
    require_model(&request.model, "model")?;
    if let Some(path) = request.path.as_deref() {
        if path.is_file() {
            return Ok(CreateSource::File(path));
        }
    }
    match request.modelfile.as_deref() {
        Some(text) if !text.is_empty() => Ok(CreateSource::Inline(text)),
        _ => Err(Error::request_with_context(
            "must provide either path or modelfile",
            ErrorContext::new()
                .with_field_path("path")
                .with_source("request_validator"),
        )),
    }
}

/// `modelfile` is the already-rewritten definition text.
pub fn create(request: &CreateRequest, modelfile: &str, stream: bool) -> Result<Operation> {
    require_model(&request.model, "model")?;
    let payload = CreatePayload {
        name: &request.model,
        modelfile,
        stream,
        quantize: request.quantize.as_deref(),
    };
    Operation::new(Method::POST, "/api/create")
        .with_json(&payload)
        .map(|op| op.streaming(stream))
}

pub fn delete(model: &str) -> Result<Operation> {
    require_model(model, "model")?;
    Operation::new(Method::DELETE, "/api/delete").with_json(&NamePayload { name: model })
}

pub fn copy(source: &str, destination: &str) -> Result<Operation> {
    require_model(source, "source")?;
    require_model(destination, "destination")?;
    Operation::new(Method::POST, "/api/copy").with_json(&CopyPayload {
        source,
        destination,
    })
}

pub fn show(model: &str) -> Result<Operation> {
    require_model(model, "model")?;
    Operation::new(Method::POST, "/api/show").with_json(&NamePayload { name: model })
}

pub fn list() -> Operation {
    Operation::new(Method::GET, "/api/tags")
}

pub fn ps() -> Operation {
    Operation::new(Method::GET, "/api/ps")
}

pub fn blob_path(digest: &BlobDigest) -> String {
    format!("/api/blobs/{}", digest)
}

/// Existence probe; 404 means "upload needed".
pub fn blob_probe(digest: &BlobDigest) -> Operation {
    Operation::new(Method::HEAD, blob_path(digest))
}

/// Raw upload of the file body to its digest-addressed endpoint.
pub fn blob_upload(digest: &BlobDigest, path: &Path) -> Operation {
    Operation::new(Method::POST, blob_path(digest)).with_body(RequestBody::File(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body_json(op: &Operation) -> Value {
        serde_json::from_slice(op.to_http().json_bytes().unwrap()).unwrap()
    }

    #[test]
    fn generate_payload_shape() {
        let op = generate(&GenerateRequest::new("llama3", "hi"), true).unwrap();
        assert_eq!(op.method, Method::POST);
        assert_eq!(op.path, "/api/generate");
        assert!(op.streaming);
        assert_eq!(
            body_json(&op),
            json!({
                "model": "llama3",
                "prompt": "hi",
                "suffix": "",
                "system": "",
                "template": "",
                "context": [],
                "stream": true,
                "raw": false,
                "images": [],
                "format": "",
                "options": {},
                "keep_alive": null
            })
        );
    }

    #[test]
    fn options_and_keep_alive_serialize_sparse() {
        let mut request = GenerateRequest::new("llama3", "hi");
        request.options.temperature = Some(0.5);
        request.options.stop = Some(vec!["\n".to_string()]);
        request.keep_alive = Some(KeepAlive::Duration("5m".to_string()));
        request.format = Format::Json;
        let body = body_json(&generate(&request, false).unwrap());
        assert_eq!(body["options"], json!({"temperature": 0.5, "stop": ["\n"]}));
        assert_eq!(body["keep_alive"], "5m");
        assert_eq!(body["format"], "json");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn chat_encodes_images_in_a_copy() {
        let request = ChatRequest::new(
            "llava",
            vec![
                Message::system("be brief"),
                Message::user("what is this?").with_image(&b"ollama"[..]),
            ],
        );
        let before = request.clone();
        let op = chat(&request, false).unwrap();
        assert_eq!(request, before);

        let body = body_json(&op);
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "be brief"}));
        assert_eq!(body["messages"][1]["images"], json!(["b2xsYW1h"]));
        assert_eq!(body["tools"], json!([]));
        assert!(!op.streaming);
    }

    #[test]
    fn bad_image_is_a_usage_error() {
        let request = GenerateRequest {
            images: vec![ImageInput::from("%%% not an image %%%")],
            ..GenerateRequest::new("llava", "describe")
        };
        assert!(generate(&request, false).unwrap_err().is_request());
    }

    #[test]
    fn embed_payloads() {
        let op = embed(&EmbedRequest::new("nomic", vec!["a".to_string(), "b".to_string()])).unwrap();
        assert_eq!(op.path, "/api/embed");
        let body = body_json(&op);
        assert_eq!(body["input"], json!(["a", "b"]));
        assert_eq!(body["truncate"], true);

        let op = embeddings(&EmbeddingsRequest::new("nomic", "hello")).unwrap();
        assert_eq!(op.path, "/api/embeddings");
        assert_eq!(body_json(&op)["prompt"], "hello");
    }

    #[test]
    fn transfer_and_management_payloads() {
        let op = pull("llama3", true, true).unwrap();
        assert_eq!(body_json(&op), json!({"name": "llama3", "insecure": true, "stream": true}));
        assert_eq!(push("me/llama3", false, false).unwrap().path, "/api/push");

        let op = delete("llama3").unwrap();
        assert_eq!(op.method, Method::DELETE);
        assert_eq!(body_json(&op), json!({"name": "llama3"}));

        let op = copy("a", "b").unwrap();
        assert_eq!(body_json(&op), json!({"source": "a", "destination": "b"}));

        assert_eq!(show("a").unwrap().path, "/api/show");
        assert_eq!(list().method, Method::GET);
        assert_eq!(ps().path, "/api/ps");
    }

    #[test]
    fn every_named_operation_requires_a_model() {
        assert!(generate(&GenerateRequest::new("", "x"), false).unwrap_err().is_request());
        assert!(chat(&ChatRequest::new("", vec![]), true).unwrap_err().is_request());
        assert!(embed(&EmbedRequest::new("", "x")).unwrap_err().is_request());
        assert!(embeddings(&EmbeddingsRequest::new("", "x")).unwrap_err().is_request());
        assert!(pull("", false, false).unwrap_err().is_request());
        assert!(push(" ", false, true).unwrap_err().is_request());
        assert!(delete("").unwrap_err().is_request());
        assert!(show("").unwrap_err().is_request());
        assert!(copy("a", "").unwrap_err().is_request());
        assert!(create_source(&CreateRequest::from_modelfile("", "FROM x")).unwrap_err().is_request());
    }

    #[test]
    fn create_source_selection() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let request = CreateRequest {
            model: "m".to_string(),
            path: Some(file.path().to_path_buf()),
            modelfile: Some("FROM inline".to_string()),
            quantize: None,
        };
        let source = create_source(&request).unwrap();
        assert_eq!(source, CreateSource::File(file.path()));
        assert_eq!(source.base_dir().as_deref(), file.path().parent());

        let request = CreateRequest {
            path: Some(PathBuf::from("/no/such/Modelfile")),
            ..CreateRequest::from_modelfile("m", "FROM llama3")
        };
        assert_eq!(create_source(&request).unwrap(), CreateSource::Inline("FROM llama3"));

        let err = create_source(&CreateRequest::from_modelfile("m", "")).unwrap_err();
        assert!(err.is_request());
    }

    #[test]
    fn create_payload() {
        let request = CreateRequest::from_modelfile("m", "FROM x").with_quantize("q4_K_M");
        let op = create(&request, "FROM @sha256:00", true).unwrap();
        assert_eq!(
            body_json(&op),
            json!({"name": "m", "modelfile": "FROM @sha256:00", "stream": true, "quantize": "q4_K_M"})
        );
    }

    #[test]
    fn blob_operations() {
        let digest = BlobDigest::from_bytes(b"x");
        let probe = blob_probe(&digest);
        assert_eq!(probe.method, Method::HEAD);
        assert_eq!(probe.path, format!("/api/blobs/{}", digest));
        assert_eq!(probe.body, RequestBody::Empty);

        let upload = blob_upload(&digest, Path::new("/tmp/x.gguf"));
        assert_eq!(upload.method, Method::POST);
        assert_eq!(upload.body, RequestBody::File(PathBuf::from("/tmp/x.gguf")));
    }
}
