//! Request, response and image types.

pub mod image;
pub mod request;
pub mod response;

pub use image::ImageInput;
pub use request::{
    ChatRequest, CreateRequest, EmbedInput, EmbedRequest, EmbeddingsRequest, Format,
    GenerateRequest, KeepAlive, Message, Options, Role, ToolCall, ToolCallFunction,
};
pub use response::{ChatMessage, ChatResponse, GenerateResponse, ProgressResponse, StatusResponse};
