//! Artifact record aggregate.

use super::{ArtifactFilename, ArtifactId, ArtifactLocation, ContentDigest};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Metadata for an uploaded artifact.
///
/// Records are immutable once created and live for the lifetime of the
/// process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    id: ArtifactId,
    filename: ArtifactFilename,
    location: ArtifactLocation,
    size_bytes: u64,
    digest: ContentDigest,
    uploaded_at: DateTime<Utc>,
}

impl ArtifactRecord {
    /// Creates a record for bytes already written to `location`.
    #[must_use]
    pub fn new(
        id: ArtifactId,
        filename: ArtifactFilename,
        location: ArtifactLocation,
        contents: &[u8],
        clock: &impl Clock,
    ) -> Self {
        Self {
            id,
            filename,
            location,
            size_bytes: u64::try_from(contents.len()).unwrap_or(u64::MAX),
            digest: ContentDigest::of(contents),
            uploaded_at: clock.utc(),
        }
    }

    /// Returns the artifact identifier.
    #[must_use]
    pub const fn id(&self) -> ArtifactId {
        self.id
    }

    /// Returns the client-supplied filename.
    #[must_use]
    pub const fn filename(&self) -> &ArtifactFilename {
        &self.filename
    }

    /// Returns the storage location handle.
    #[must_use]
    pub const fn location(&self) -> &ArtifactLocation {
        &self.location
    }

    /// Returns the payload size in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Returns the payload digest.
    #[must_use]
    pub const fn digest(&self) -> &ContentDigest {
        &self.digest
    }

    /// Returns the upload timestamp.
    #[must_use]
    pub const fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }
}
