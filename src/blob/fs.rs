//! Local filesystem blob store

use super::{blob_key, BlobResult, BlobStore, PayloadKind};
use async_trait::async_trait;
use std::path::PathBuf;

/// Stores payloads as files under a root directory
///
/// Each write goes to a temporary sibling first and is renamed into place,
/// so readers never observe a partial payload.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Filesystem path of a key
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn write(
        &self,
        patch: &str,
        region: &str,
        match_id: &str,
        kind: PayloadKind,
        payload: &serde_json::Value,
    ) -> BlobResult<String> {
        let key = blob_key(patch, region, kind, match_id)?;
        let path = self.path_for(&key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec(payload)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!("Stored {} ({} bytes)", key, bytes.len());
        Ok(key)
    }
}
