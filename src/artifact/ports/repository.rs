//! Repository port for artifact metadata.

use crate::artifact::domain::{ArtifactId, ArtifactRecord};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for artifact repository operations.
pub type ArtifactRepositoryResult<T> = Result<T, ArtifactRepositoryError>;

/// Registry contract for uploaded artifact records.
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Stores a new artifact record.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactRepositoryError::DuplicateArtifact`] when the ID is
    /// already registered.
    async fn register(&self, record: &ArtifactRecord) -> ArtifactRepositoryResult<()>;

    /// Finds an artifact by identifier.
    async fn find_by_id(
        &self,
        artifact_id: ArtifactId,
    ) -> ArtifactRepositoryResult<Option<ArtifactRecord>>;

    /// Returns every registered artifact.
    async fn list_all(&self) -> ArtifactRepositoryResult<Vec<ArtifactRecord>>;
}

/// Errors returned by artifact repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ArtifactRepositoryError {
    /// An artifact with the same identifier already exists.
    #[error("duplicate artifact identifier: {0}")]
    DuplicateArtifact(ArtifactId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ArtifactRepositoryError {
    /// Wraps a persistence-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
