//! Artifact upload and lookup service.

use crate::artifact::{
    domain::{ArtifactDomainError, ArtifactFilename, ArtifactId, ArtifactRecord},
    ports::{ArtifactRepository, ArtifactRepositoryError, ArtifactStore, ArtifactStoreError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Request payload for uploading an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadArtifactRequest {
    /// Filename supplied by the client.
    pub filename: String,
    /// Raw artifact bytes.
    pub contents: Vec<u8>,
}

impl UploadArtifactRequest {
    /// Creates an upload request.
    #[must_use]
    pub fn new(filename: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            contents: contents.into(),
        }
    }
}

/// Service-level errors for artifact operations.
#[derive(Debug, Error)]
pub enum ArtifactServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] ArtifactDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] ArtifactRepositoryError),
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] ArtifactStoreError),
    /// No artifact exists with the given identifier.
    #[error("artifact {0} not found")]
    NotFound(ArtifactId),
}

/// Result type for artifact service operations.
pub type ArtifactServiceResult<T> = Result<T, ArtifactServiceError>;

/// Artifact registry service: upload, lookup, listing, and payload access.
pub struct ArtifactService<R, S, C>
where
    R: ArtifactRepository,
    S: ArtifactStore,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    store: Arc<S>,
    clock: Arc<C>,
}

impl<R, S, C> Clone for ArtifactService<R, S, C>
where
    R: ArtifactRepository,
    S: ArtifactStore,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, S, C> ArtifactService<R, S, C>
where
    R: ArtifactRepository,
    S: ArtifactStore,
    C: Clock + Send + Sync,
{
    /// Creates a new artifact service.
    #[must_use]
    pub const fn new(repository: Arc<R>, store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            repository,
            store,
            clock,
        }
    }

    /// Stores an uploaded artifact and registers its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactServiceError::Domain`] for an empty filename or
    /// payload, or store and repository errors.
    pub async fn upload(
        &self,
        request: UploadArtifactRequest,
    ) -> ArtifactServiceResult<ArtifactRecord> {
        let UploadArtifactRequest { filename, contents } = request;
        let validated_filename = ArtifactFilename::new(filename)?;
        if contents.is_empty() {
            return Err(ArtifactDomainError::EmptyPayload.into());
        }

        let artifact_id = ArtifactId::new();
        let location = self.store.store(artifact_id, &contents).await?;
        let record = ArtifactRecord::new(
            artifact_id,
            validated_filename,
            location,
            &contents,
            &*self.clock,
        );
        self.repository.register(&record).await?;

        info!(
            artifact_id = %record.id(),
            filename = %record.filename(),
            size_bytes = record.size_bytes(),
            "artifact uploaded"
        );
        Ok(record)
    }

    /// Finds an artifact by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactServiceError::Repository`] when lookup fails.
    pub async fn find(
        &self,
        artifact_id: ArtifactId,
    ) -> ArtifactServiceResult<Option<ArtifactRecord>> {
        Ok(self.repository.find_by_id(artifact_id).await?)
    }

    /// Returns an artifact by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactServiceError::NotFound`] when the artifact is
    /// unknown.
    pub async fn get(&self, artifact_id: ArtifactId) -> ArtifactServiceResult<ArtifactRecord> {
        self.find(artifact_id)
            .await?
            .ok_or(ArtifactServiceError::NotFound(artifact_id))
    }

    /// Lists all artifacts ordered by upload time.
    ///
    /// # Errors
    ///
    /// Returns repository errors.
    pub async fn list(&self) -> ArtifactServiceResult<Vec<ArtifactRecord>> {
        let mut records = self.repository.list_all().await?;
        records.sort_by(|left, right| {
            left.uploaded_at()
                .cmp(&right.uploaded_at())
                .then_with(|| left.id().cmp(&right.id()))
        });
        Ok(records)
    }

    /// Loads the stored payload of `record`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactServiceError::Store`] when the bytes are missing or
    /// unreadable.
    pub async fn load_contents(&self, record: &ArtifactRecord) -> ArtifactServiceResult<Vec<u8>> {
        Ok(self.store.load(record.location()).await?)
    }
}
