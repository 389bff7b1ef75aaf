//! In-memory artifact adapters.
//!
//! The repository is the production registry (artifacts are not persisted
//! across restarts); the store is intended for tests.

mod repository;
mod store;

pub use repository::InMemoryArtifactRepository;
pub use store::InMemoryArtifactStore;
