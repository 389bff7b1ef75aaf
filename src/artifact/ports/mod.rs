//! Port contracts for artifact metadata and byte storage.

mod repository;
mod store;

pub use repository::{ArtifactRepository, ArtifactRepositoryError, ArtifactRepositoryResult};
pub use store::{ArtifactStore, ArtifactStoreError, ArtifactStoreResult};
