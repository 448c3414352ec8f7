//! Client interface for the model-serving API.
//!
//! Keep the public surface small and predictable: one builder, one async client,
//! one blocking client. Implementation details are split into submodules under
//! `src/client/`.

pub mod blocking;
pub mod builder;
pub mod config;
pub mod core;

pub use blocking::BlockingClient;
pub use builder::ClientBuilder;
pub use config::ClientConfig;
pub use core::Client;
