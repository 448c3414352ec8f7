//! Image inputs for multimodal generate/chat calls.

use crate::{Error, ErrorContext, Result};
use base64::Engine as _;
use std::path::{Path, PathBuf};

/// An image as the caller has it. Resolved to base64 text by [`ImageInput::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// A file on disk.
    Path(PathBuf),
    /// Either a file path or already-encoded base64 text.
    Text(String),
    /// Raw image bytes, or base64 text given as bytes.
    Bytes(Vec<u8>),
}

impl ImageInput {
    /// Resolve to a base64 string.
    ///
    /// Checked in order: existing file path, valid base64, raw bytes. Input that
    /// fits none of these is a usage error.
    pub fn encode(&self) -> Result<String> {
        match self {
            ImageInput::Path(path) => match read_file(path)? {
                Some(data) => Ok(encode_bytes(&data)),
                None => Err(unusable(&format!("no such file: {}", path.display()))),
            },
            ImageInput::Text(text) => {
                if let Some(data) = read_file(Path::new(text))? {
                    return Ok(encode_bytes(&data));
                }
                if is_base64(text.as_bytes()) {
                    return Ok(text.clone());
                }
                Err(unusable("text is neither an existing file nor base64"))
            }
            ImageInput::Bytes(bytes) => {
                if is_base64(bytes) {
                    if let Ok(text) = std::str::from_utf8(bytes) {
                        return Ok(text.to_string());
                    }
                }
                Ok(encode_bytes(bytes))
            }
        }
    }
}

fn read_file(path: &Path) -> Result<Option<Vec<u8>>> {
    if path.as_os_str().is_empty() || !path.is_file() {
        return Ok(None);
    }
    Ok(Some(std::fs::read(path)?))
}

fn is_base64(data: &[u8]) -> bool {
    base64::engine::general_purpose::STANDARD.decode(data).is_ok()
}

fn encode_bytes(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn unusable(details: &str) -> Error {
    Error::request_with_context(
        "image must be bytes, a path to an existing file, or base64 text",
        ErrorContext::new()
            .with_details(details)
            .with_source("image_encoder"),
    )
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        ImageInput::Path(path)
    }
}

impl From<&Path> for ImageInput {
    fn from(path: &Path) -> Self {
        ImageInput::Path(path.to_path_buf())
    }
}

impl From<String> for ImageInput {
    fn from(text: String) -> Self {
        ImageInput::Text(text)
    }
}

impl From<&str> for ImageInput {
    fn from(text: &str) -> Self {
        ImageInput::Text(text.to_string())
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        ImageInput::Bytes(bytes)
    }
}

impl From<&[u8]> for ImageInput {
    fn from(bytes: &[u8]) -> Self {
        ImageInput::Bytes(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn raw_bytes_are_encoded() {
        let img = ImageInput::from(&b"ollama"[..]);
        assert_eq!(img.encode().unwrap(), "b2xsYW1h");
    }

    #[test]
    fn base64_passes_through() {
        assert_eq!(ImageInput::from("YWJj").encode().unwrap(), "YWJj");
        assert_eq!(ImageInput::from(b"YWJj".to_vec()).encode().unwrap(), "YWJj");
    }

    #[test]
    fn existing_paths_are_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"ollama").unwrap();

        let by_path = ImageInput::from(file.path()).encode().unwrap();
        let by_text = ImageInput::from(file.path().to_str().unwrap()).encode().unwrap();
        assert_eq!(by_path, "b2xsYW1h");
        assert_eq!(by_text, "b2xsYW1h");
    }

    #[test]
    fn unusable_inputs_are_usage_errors() {
        let err = ImageInput::from("not base64 and not a file!")
            .encode()
            .unwrap_err();
        assert!(err.is_request());

        let err = ImageInput::Path(PathBuf::from("/no/such/image.png"))
            .encode()
            .unwrap_err();
        assert!(err.is_request());
    }
}
