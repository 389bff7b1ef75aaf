//! Application services for artifact upload and lookup.

mod catalog;

pub use catalog::{
    ArtifactService, ArtifactServiceError, ArtifactServiceResult, UploadArtifactRequest,
};
