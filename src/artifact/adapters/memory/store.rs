//! In-memory artifact byte store.

use crate::artifact::{
    domain::{ArtifactId, ArtifactLocation},
    ports::{ArtifactStore, ArtifactStoreError, ArtifactStoreResult},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory artifact store keyed by `memory://<id>` handles.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactStore {
    blobs: Arc<RwLock<HashMap<ArtifactLocation, Vec<u8>>>>,
}

impl InMemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn store(
        &self,
        artifact_id: ArtifactId,
        contents: &[u8],
    ) -> ArtifactStoreResult<ArtifactLocation> {
        let location = ArtifactLocation::new(format!("memory://{artifact_id}"))
            .map_err(ArtifactStoreError::io)?;
        let mut blobs = self
            .blobs
            .write()
            .map_err(|err| ArtifactStoreError::io(std::io::Error::other(err.to_string())))?;
        blobs.insert(location.clone(), contents.to_vec());
        Ok(location)
    }

    async fn load(&self, location: &ArtifactLocation) -> ArtifactStoreResult<Vec<u8>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|err| ArtifactStoreError::io(std::io::Error::other(err.to_string())))?;
        blobs
            .get(location)
            .cloned()
            .ok_or_else(|| ArtifactStoreError::Missing(location.clone()))
    }
}
