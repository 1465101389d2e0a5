//! Blob storage for raw CI report artifacts, keyed by `<prefix>/<commit sha>`

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{HooksError, Result};

pub const COVERAGE_PREFIX: &str = "coverage";
pub const QUALITY_PREFIX: &str = "quality";

#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Returns the text stored under `prefix/key`, or `None` when there is none.
    async fn get_text(&self, prefix: &str, key: &str) -> Result<Option<String>>;
}

/// Blob store backed by a local directory tree.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, prefix: &str, key: &str) -> Result<PathBuf> {
        let safe = |part: &str| {
            !part.is_empty() && part != ".." && part != "." && !part.contains(['/', '\\'])
        };
        if !safe(prefix) || !safe(key) {
            return Err(HooksError::InvalidPayload(format!(
                "invalid blob key '{}/{}'",
                prefix, key
            )));
        }
        Ok(self.root.join(prefix).join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get_text(&self, prefix: &str, key: &str) -> Result<Option<String>> {
        let path = self.object_path(prefix, key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No blob at {:?}", path);
                Ok(None)
            }
            Err(e) => Err(HooksError::IoError(e)),
        }
    }
}
