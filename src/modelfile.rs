//! Model definition rewriting.
//!
//! A model definition is line-oriented text. Lines starting with `FROM` or
//! `ADAPTER` (any case) name a base model or adapter, either symbolically or as a
//! local file. Before `create`, local files are uploaded as blobs and their
//! references replaced by `@sha256:...`. Every other byte of the document is kept.
//!
//! Parsing is pure; the upload is injected, so the async and blocking clients
//! drive the same rewrite.

use crate::blob::BlobDigest;
use crate::Result;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directive keywords whose argument may be a local file.
pub const FILE_DIRECTIVES: [&str; 2] = ["FROM", "ADAPTER"];

#[derive(Debug, Clone, PartialEq)]
enum Line {
    /// Copied through verbatim, terminator included.
    Verbatim(String),
    /// A directive whose argument resolved to a local file.
    LocalFile {
        original: String,
        command: String,
        path: PathBuf,
        terminator: String,
    },
}

/// A parsed model definition document.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    lines: Vec<Line>,
}

impl ModelDefinition {
    /// Parse `document`, resolving relative references against `base`
    /// (the current directory when `None`).
    pub fn parse(document: &str, base: Option<&Path>) -> Result<Self> {
        let base = match base {
            Some(base) => base.to_path_buf(),
            None => std::env::current_dir()?,
        };

        let lines = document
            .split_inclusive('\n')
            .map(|line| parse_line(line, &base))
            .collect();

        Ok(Self { lines })
    }

    /// Local files referenced by directives, first occurrence order, deduplicated.
    pub fn local_files(&self) -> Vec<&Path> {
        let mut seen = Vec::new();
        for line in &self.lines {
            if let Line::LocalFile { path, .. } = line {
                if !seen.contains(&path.as_path()) {
                    seen.push(path.as_path());
                }
            }
        }
        seen
    }

    /// Render with each local file replaced by its digest reference.
    ///
    /// A file missing from `digests` keeps its original line.
    pub fn render(&self, digests: &HashMap<PathBuf, BlobDigest>) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Verbatim(text) => out.push_str(text),
                Line::LocalFile {
                    original,
                    command,
                    path,
                    terminator,
                } => match digests.get(path) {
                    Some(digest) => {
                        out.push_str(command);
                        out.push(' ');
                        out.push_str(&digest.reference());
                        out.push_str(terminator);
                    }
                    None => out.push_str(original),
                },
            }
        }
        out
    }

    /// Upload every local file with `upload` (once per distinct file) and render.
    pub fn rewrite_with<F>(&self, mut upload: F) -> Result<String>
    where
        F: FnMut(&Path) -> Result<BlobDigest>,
    {
        let mut digests = HashMap::new();
        for path in self.local_files() {
            let digest = upload(path)?;
            record_digest(&mut digests, path, digest);
        }
        Ok(self.render(&digests))
    }

    /// Async counterpart of [`rewrite_with`](Self::rewrite_with). Uploads run
    /// one at a time, in document order.
    pub async fn rewrite_with_async<F, Fut>(&self, mut upload: F) -> Result<String>
    where
        F: FnMut(PathBuf) -> Fut,
        Fut: Future<Output = Result<BlobDigest>>,
    {
        let mut digests = HashMap::new();
        for path in self.local_files() {
            let digest = upload(path.to_path_buf()).await?;
            record_digest(&mut digests, path, digest);
        }
        Ok(self.render(&digests))
    }
}

fn record_digest(digests: &mut HashMap<PathBuf, BlobDigest>, path: &Path, digest: BlobDigest) {
    debug!(path = %path.display(), digest = %digest, "model definition reference rewritten");
    digests.insert(path.to_path_buf(), digest);
}

fn parse_line(line: &str, base: &Path) -> Line {
    let verbatim = || Line::Verbatim(line.to_string());

    let Some((command, remainder)) = line.split_once(' ') else {
        return verbatim();
    };
    if !FILE_DIRECTIVES
        .iter()
        .any(|d| command.eq_ignore_ascii_case(d))
    {
        return verbatim();
    }

    let reference = remainder.trim();
    if reference.is_empty() {
        return verbatim();
    }

    let path = expand_home(reference);
    let path = if path.is_absolute() {
        path
    } else {
        base.join(path)
    };
    if !path.is_file() {
        // Symbolic model name, or a path that does not exist: keep as written.
        return verbatim();
    }

    Line::LocalFile {
        original: line.to_string(),
        command: command.to_string(),
        path,
        terminator: line_terminator(line).to_string(),
    }
}

fn line_terminator(line: &str) -> &str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

/// Expand a leading `~` to the home directory.
fn expand_home(reference: &str) -> PathBuf {
    let rest = if reference == "~" {
        Some("")
    } else {
        reference
            .strip_prefix("~/")
            .or_else(|| reference.strip_prefix("~\\"))
    };
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(reference),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fake_upload(path: &Path) -> Result<BlobDigest> {
        BlobDigest::from_file(path)
    }

    #[test]
    fn passthrough_lines_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let doc = "# comment\nPARAMETER temperature 0.7\r\nSYSTEM \"\"\"\nyou are  terse\n\"\"\"\nFROM\nTEMPLATE {{ .Prompt }}";
        let def = ModelDefinition::parse(doc, Some(dir.path())).unwrap();
        assert!(def.local_files().is_empty());
        assert_eq!(def.rewrite_with(fake_upload).unwrap(), doc);
    }

    #[test]
    fn symbolic_references_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let doc = "FROM llama3:8b\nADAPTER  missing-adapter.gguf  \n";
        let def = ModelDefinition::parse(doc, Some(dir.path())).unwrap();
        assert_eq!(def.rewrite_with(fake_upload).unwrap(), doc);
    }

    #[test]
    fn local_files_become_digest_references() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.gguf"), b"weights").unwrap();
        fs::write(dir.path().join("adapter.bin"), b"lora").unwrap();

        let doc = "from model.gguf\nPARAMETER stop x\nADAPTER ./adapter.bin\r\nFROM model.gguf";
        let def = ModelDefinition::parse(doc, Some(dir.path())).unwrap();
        assert_eq!(def.local_files().len(), 2);

        let mut calls = 0;
        let out = def
            .rewrite_with(|p| {
                calls += 1;
                fake_upload(p)
            })
            .unwrap();
        assert_eq!(calls, 2);

        let weights = BlobDigest::from_bytes(b"weights");
        let lora = BlobDigest::from_bytes(b"lora");
        assert_eq!(
            out,
            format!(
                "from @{w}\nPARAMETER stop x\nADAPTER @{l}\r\nFROM @{w}",
                w = weights,
                l = lora
            )
        );
    }

    #[test]
    fn absolute_paths_ignore_base() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("abs.gguf");
        fs::write(&file, b"abs").unwrap();
        let other = tempfile::tempdir().unwrap();

        let doc = format!("FROM {}\n", file.display());
        let out = ModelDefinition::parse(&doc, Some(other.path()))
            .unwrap()
            .rewrite_with(fake_upload)
            .unwrap();
        assert_eq!(out, format!("FROM @{}\n", BlobDigest::from_bytes(b"abs")));
    }

    #[test]
    fn render_without_digest_keeps_original_line() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("m.gguf"), b"m").unwrap();
        let doc = "FROM   m.gguf  \n";
        let def = ModelDefinition::parse(doc, Some(dir.path())).unwrap();
        assert_eq!(def.local_files().len(), 1);
        assert_eq!(def.render(&HashMap::new()), doc);
    }

    #[test]
    fn directories_are_not_uploaded() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("weights")).unwrap();
        let doc = "FROM weights\n";
        let def = ModelDefinition::parse(doc, Some(dir.path())).unwrap();
        assert!(def.local_files().is_empty());
    }

    #[test]
    fn upload_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("m.gguf"), b"m").unwrap();
        let def = ModelDefinition::parse("FROM m.gguf\n", Some(dir.path())).unwrap();
        let err = def
            .rewrite_with(|_| Err(crate::Error::response("boom", Some(500))))
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
    }

    #[test]
    fn async_rewrite_matches_blocking_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.gguf"), b"weights").unwrap();
        let doc = "FROM model.gguf\nADAPTER model.gguf\nPARAMETER seed 7\n";
        let def = ModelDefinition::parse(doc, Some(dir.path())).unwrap();

        let mut calls = 0;
        let out = tokio_test::block_on(def.rewrite_with_async(|path| {
            calls += 1;
            async move { fake_upload(&path) }
        }))
        .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(out, def.rewrite_with(fake_upload).unwrap());
    }

    #[test]
    fn home_expansion() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~"), home);
            assert_eq!(expand_home("~/models/a.gguf"), home.join("models/a.gguf"));
        }
        assert_eq!(expand_home("models/~a"), PathBuf::from("models/~a"));
    }
}
