//! Content digests for model artifacts.
//!
//! A digest is `sha256:<64 lowercase hex>`. It names a blob on the server and is
//! the only integrity check the upload carries.

use crate::transport::BLOB_CHUNK_SIZE;
use crate::{Error, ErrorContext, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tokio::io::AsyncReadExt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobDigest(String);

impl BlobDigest {
    pub const PREFIX: &'static str = "sha256:";

    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self::finish(hasher)
    }

    /// Hash a reader in fixed-size chunks, so memory use does not grow with input size.
    pub fn from_reader<R: Read>(mut reader: R) -> std::io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut chunk = vec![0u8; BLOB_CHUNK_SIZE];
        loop {
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
        }
        Ok(Self::finish(hasher))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Ok(Self::from_reader(file)?)
    }

    /// Same as [`from_file`](Self::from_file), reading through tokio.
    pub async fn from_file_async(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = tokio::fs::File::open(path.as_ref()).await?;
        let mut hasher = Sha256::new();
        let mut chunk = vec![0u8; BLOB_CHUNK_SIZE];
        loop {
            let n = file.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
        }
        Ok(Self::finish(hasher))
    }

    /// Validate a digest string.
    pub fn parse(s: &str) -> Result<Self> {
        let hex = s.strip_prefix(Self::PREFIX).ok_or_else(|| invalid(s, "missing sha256: prefix"))?;
        if hex.len() != 64 {
            return Err(invalid(s, "expected 64 hex characters"));
        }
        if !hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(invalid(s, "expected lowercase hex"));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 64 hex characters without prefix.
    pub fn hex(&self) -> &str {
        &self.0[Self::PREFIX.len()..]
    }

    /// `@sha256:...`, the form used inside model definitions.
    pub fn reference(&self) -> String {
        format!("@{}", self.0)
    }

    fn finish(hasher: Sha256) -> Self {
        let hex: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Self(format!("{}{}", Self::PREFIX, hex))
    }
}

fn invalid(s: &str, details: &str) -> Error {
    Error::request_with_context(
        format!("invalid blob digest: {}", s),
        ErrorContext::new()
            .with_details(details)
            .with_source("blob_digest"),
    )
}

impl fmt::Display for BlobDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BlobDigest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for BlobDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
