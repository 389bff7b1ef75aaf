//! Domain model for uploaded artifacts.

mod error;
mod ids;
mod record;

pub use error::ArtifactDomainError;
pub use ids::{ArtifactFilename, ArtifactId, ArtifactLocation, ContentDigest};
pub use record::ArtifactRecord;
