//! In-memory artifact repository.

use crate::artifact::{
    domain::{ArtifactId, ArtifactRecord},
    ports::{ArtifactRepository, ArtifactRepositoryError, ArtifactRepositoryResult},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory artifact repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactRepository {
    state: Arc<RwLock<HashMap<ArtifactId, ArtifactRecord>>>,
}

impl InMemoryArtifactRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactRepository for InMemoryArtifactRepository {
    async fn register(&self, record: &ArtifactRecord) -> ArtifactRepositoryResult<()> {
        let mut state = self.state.write().map_err(|err| {
            ArtifactRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;

        if state.contains_key(&record.id()) {
            return Err(ArtifactRepositoryError::DuplicateArtifact(record.id()));
        }

        state.insert(record.id(), record.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        artifact_id: ArtifactId,
    ) -> ArtifactRepositoryResult<Option<ArtifactRecord>> {
        let state = self.state.read().map_err(|err| {
            ArtifactRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(state.get(&artifact_id).cloned())
    }

    async fn list_all(&self) -> ArtifactRepositoryResult<Vec<ArtifactRecord>> {
        let state = self.state.read().map_err(|err| {
            ArtifactRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(state.values().cloned().collect())
    }
}
