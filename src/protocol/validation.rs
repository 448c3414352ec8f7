//! 请求参数校验：在任何网络 I/O 之前执行。
//!
//! Local argument validation.

use crate::{Error, ErrorContext, Result};

/// Reject an empty (or whitespace-only) model identifier.
pub fn require_model(model: &str, field: &str) -> Result<()> {
    if model.trim().is_empty() {
        return Err(Error::request_with_context(
            "must provide a model",
            ErrorContext::new()
                .with_field_path(field)
                .with_source("request_validator"),
        ));
    }
    Ok(())
}
