//! Object storage for generated documents.

use super::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

/// Somewhere a finished document can be put and later retrieved by URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `path` and return the URL to retrieve them.
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<String>;
}

/// Stores documents in a local directory; the "URL" is the file path.
pub struct LocalDirStorage {
    root: PathBuf,
}

impl LocalDirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStorage for LocalDirStorage {
    async fn upload(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        info!("Wrote {} ({} bytes)", target.display(), bytes.len());
        Ok(target.to_string_lossy().to_string())
    }
}
