//! Storage port for artifact payload bytes.

use crate::artifact::domain::{ArtifactId, ArtifactLocation};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for artifact store operations.
pub type ArtifactStoreResult<T> = Result<T, ArtifactStoreError>;

/// Byte storage for uploaded artifacts.
///
/// Stores treat payloads as opaque and trusted; nothing here inspects or
/// executes them.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persists `contents` for `artifact_id` and returns its location.
    async fn store(
        &self,
        artifact_id: ArtifactId,
        contents: &[u8],
    ) -> ArtifactStoreResult<ArtifactLocation>;

    /// Loads the payload previously stored at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactStoreError::Missing`] when nothing is stored there.
    async fn load(&self, location: &ArtifactLocation) -> ArtifactStoreResult<Vec<u8>>;
}

/// Errors returned by artifact store implementations.
#[derive(Debug, Clone, Error)]
pub enum ArtifactStoreError {
    /// No payload exists at the location.
    #[error("no artifact stored at {0}")]
    Missing(ArtifactLocation),

    /// Underlying storage failure.
    #[error("artifact storage error: {0}")]
    Io(Arc<dyn std::error::Error + Send + Sync>),
}

impl ArtifactStoreError {
    /// Wraps an underlying storage failure.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io(Arc::new(err))
    }
}
