//! ArtifactStore - In-Memory Upload Store
//!
//! ## Responsibilities
//!
//! - Single source of truth for uploaded files
//! - Assign ids (1, 2, 3, ...) in insertion order, never reused
//! - Metadata listing and point lookup by id
//!
//! Content lives only in process memory and is lost on restart.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::formats;

/// Artifact identifier (starts at 1)
pub type ArtifactId = u64;

/// Stored upload
///
/// Fields are fixed at insertion. Cloning is cheap since `content` is
/// reference counted.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub id: ArtifactId,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub content: Bytes,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Metadata projection without content
    pub fn meta(&self) -> ArtifactMeta {
        ArtifactMeta {
            id: self.id,
            filename: self.filename.clone(),
            size: self.size,
            created: self.created_at,
        }
    }
}

/// Public artifact metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub id: ArtifactId,
    pub filename: String,
    pub size: u64,
    pub created: DateTime<Utc>,
}

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub artifact_count: usize,
    pub total_bytes: u64,
}

/// Ordered artifacts plus the id counter, guarded together
struct StoreInner {
    artifacts: Vec<Artifact>,
    next_id: ArtifactId,
}

/// ArtifactStore instance
pub struct ArtifactStore {
    inner: RwLock<StoreInner>,
}

impl ArtifactStore {
    /// Create empty store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                artifacts: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Store an upload and return the stored record
    ///
    /// `declared_content_type` wins when non-empty; otherwise the type is
    /// guessed from the filename extension.
    pub async fn insert(
        &self,
        filename: impl Into<String>,
        content: Bytes,
        declared_content_type: Option<&str>,
    ) -> Artifact {
        let filename = filename.into();
        let content_type = formats::resolve_content_type(&filename, declared_content_type);

        let artifact = {
            let mut inner = self.inner.write().await;
            let artifact = Artifact {
                id: inner.next_id,
                filename,
                size: content.len() as u64,
                content_type,
                content,
                created_at: Utc::now(),
            };
            inner.artifacts.push(artifact.clone());
            inner.next_id += 1;
            artifact
        };

        tracing::info!(
            artifact_id = artifact.id,
            filename = %artifact.filename,
            content_type = %artifact.content_type,
            size = %formats::format_size(artifact.size),
            "Stored file"
        );

        artifact
    }

    /// Metadata of all artifacts in insertion order
    pub async fn list(&self) -> Vec<ArtifactMeta> {
        let inner = self.inner.read().await;
        inner.artifacts.iter().map(Artifact::meta).collect()
    }

    /// Look up an artifact by id
    pub async fn get(&self, id: ArtifactId) -> Option<Artifact> {
        if id == 0 {
            return None;
        }

        let inner = self.inner.read().await;
        // ids are dense and start at 1, so the id doubles as an index
        inner
            .artifacts
            .get((id - 1) as usize)
            .filter(|artifact| artifact.id == id)
            .cloned()
    }

    /// Number of stored artifacts
    pub async fn len(&self) -> usize {
        self.inner.read().await.artifacts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Get store statistics
    pub async fn stats(&self) -> StoreStats {
        let inner = self.inner.read().await;
        StoreStats {
            artifact_count: inner.artifacts.len(),
            total_bytes: inner.artifacts.iter().map(|a| a.size).sum(),
        }
    }
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}
