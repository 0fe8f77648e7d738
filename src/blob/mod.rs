//! Raw payload storage
//!
//! Match and timeline payloads are stored as opaque compact JSON under
//! `raw/{patch}/{region}/{matches|timelines}/{match_id}.json`.

mod fs;

pub use fs::FsBlobStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while storing payloads
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid blob key component: '{0}'")]
    InvalidKey(String),
}

/// Result type for blob operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Kind of payload stored for a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Match,
    Timeline,
}

impl PayloadKind {
    /// Folder name under the region prefix
    pub fn folder(&self) -> &'static str {
        match self {
            Self::Match => "matches",
            Self::Timeline => "timelines",
        }
    }

    /// Endpoint label used in metrics
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Timeline => "timeline",
        }
    }
}

/// Builds the object key for a payload
///
/// # Returns
///
/// * `Ok(String)` - The key, e.g. `raw/14.1/americas/matches/NA1_1.json`
/// * `Err(BlobError::InvalidKey)` - A component is empty or would escape its folder
pub fn blob_key(patch: &str, region: &str, kind: PayloadKind, match_id: &str) -> BlobResult<String> {
    for component in [patch, region, match_id] {
        if component.is_empty()
            || component == "."
            || component == ".."
            || component.contains(['/', '\\'])
        {
            return Err(BlobError::InvalidKey(component.to_string()));
        }
    }
    Ok(format!(
        "raw/{}/{}/{}/{}.json",
        patch,
        region.to_lowercase(),
        kind.folder(),
        match_id
    ))
}

/// Durable storage for raw payloads
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores a payload as compact JSON and returns its key
    ///
    /// Writing the same key again replaces the previous payload.
    async fn write(
        &self,
        patch: &str,
        region: &str,
        match_id: &str,
        kind: PayloadKind,
        payload: &serde_json::Value,
    ) -> BlobResult<String>;
}
