use thiserror::Error;

/// Structured error context for usage errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Argument or payload field that was rejected (e.g., "model", "messages[0].images[1]")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected shape, offending value)
    pub details: Option<String>,
    /// Component that raised the error (e.g., "request_validator", "image_encoder")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the client.
///
/// `Request` is the usage error kind: it is always raised before any network I/O.
/// `Response` is the service error kind: a failure status from the server, or an
/// `error` field discovered inside a streaming response (then `status_code` is `None`).
#[derive(Debug, Error)]
pub enum Error {
    #[error("Request error: {message}{}", format_context(.context))]
    Request {
        message: String,
        context: ErrorContext,
    },

    #[error("Response error{}: {message}", format_status(.status_code))]
    Response {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

impl Error {
    /// Create a usage error with structured context.
    pub fn request_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Request {
            message: msg.into(),
            context,
        }
    }

    /// Create a usage error without context.
    pub fn request(msg: impl Into<String>) -> Self {
        Self::request_with_context(msg, ErrorContext::new())
    }

    /// Create a service error.
    ///
    /// `raw` may be a JSON document carrying an `error` field; its value becomes the
    /// message. Anything else is used verbatim.
    pub fn response(raw: &str, status_code: Option<u16>) -> Self {
        Error::Response {
            message: extract_error_message(raw),
            status_code,
        }
    }

    /// HTTP status of a service error, if it came from a status line.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Response { status_code, .. } => *status_code,
            _ => None,
        }
    }

    /// True for the usage error kind.
    pub fn is_request(&self) -> bool {
        matches!(self, Error::Request { .. })
    }

    /// True when the server answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Request { context, .. } => Some(context),
            _ => None,
        }
    }
}

/// Pull a human-readable message out of an error body.
pub(crate) fn extract_error_message(raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => match map.get("error") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => raw.to_string(),
            Some(other) => other.to_string(),
        },
        _ => raw.to_string(),
    }
}
