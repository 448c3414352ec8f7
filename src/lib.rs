//! # ollama-lib-rust
//!
//! Client library for the Ollama model-serving HTTP API: generation, chat,
//! embeddings and model lifecycle.
//!
//! ## Overview
//!
//! The interesting part of the client is not the per-endpoint parameter plumbing
//! but the protocol engine underneath it:
//!
//! - **Host resolution**: a loose address string (`"example.com"`, `":8080"`,
//!   `"https://host"`) becomes a canonical `scheme://host:port` target.
//! - **Streaming decode**: line-delimited JSON responses are decoded lazily, one
//!   line at a time, and an `error` field inside an HTTP 200 stream ends it with an error.
//! - **Uniform dispatch**: every failure status becomes [`Error::Response`] with the
//!   server's message; argument problems become [`Error::Request`] before any I/O.
//! - **Blob transfer**: local model artifacts are hashed (`sha256:<hex>`), probed
//!   with `HEAD`, and uploaded only when the server does not have them yet.
//! - **Model definition rewriting**: `FROM`/`ADAPTER` lines pointing at local files
//!   are rewritten to `@<digest>` references before `create` is called.
//!
//! Both execution styles are supported over the same core: [`Client`] is async
//! (tokio), [`BlockingClient`] parks the calling thread. They send byte-identical
//! payloads and report errors identically.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use ollama_lib_rust::{Client, GenerateRequest};
//!
//! #[tokio::main]
//! async fn main() -> ollama_lib_rust::Result<()> {
//!     let client = Client::new()?;
//!
//!     let mut stream = client
//!         .generate_stream(&GenerateRequest::new("llama3", "Why is the sky blue?"))
//!         .await?;
//!     while let Some(message) = stream.next().await {
//!         let message = message?;
//!         print!("{}", message.get("response").and_then(|v| v.as_str()).unwrap_or(""));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`host`] | Target address resolution |
//! | [`transport`] | Async and blocking HTTP transports behind one request type |
//! | [`protocol`] | Request building, validation and error translation |
//! | [`stream`] | Line-delimited JSON stream decoding |
//! | [`blob`] | Content digests for model artifacts |
//! | [`modelfile`] | Model definition parsing and rewriting |
//! | [`types`] | Request, response and image types |
//! | [`client`] | [`Client`], [`BlockingClient`] and their builder |

pub mod blob;
pub mod client;
pub mod host;
pub mod modelfile;
pub mod protocol;
pub mod stream;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use blob::BlobDigest;
pub use client::{BlockingClient, Client, ClientBuilder, ClientConfig};
pub use host::TargetAddress;
pub use modelfile::ModelDefinition;
pub use stream::{BlockingMessageStream, MessageStream, StreamMessage};
pub use types::{
    image::ImageInput,
    request::{
        ChatRequest, CreateRequest, EmbedInput, EmbedRequest, EmbeddingsRequest, Format,
        GenerateRequest, KeepAlive, Message, Options, Role, ToolCall, ToolCallFunction,
    },
    response::{ChatResponse, GenerateResponse, ProgressResponse, StatusResponse},
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
