//! Listing view combining artifacts with their deployment status.

use super::ServicePort;
use crate::artifact::domain::{ArtifactFilename, ArtifactId};
use serde::{Deserialize, Serialize};

/// One row of the artifact listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactStatus {
    /// Artifact identifier.
    pub artifact_id: ArtifactId,
    /// Filename supplied at upload.
    pub filename: ArtifactFilename,
    /// Whether a running deployment exists.
    pub deployed: bool,
    /// Port of the running deployment, if any.
    pub port: Option<ServicePort>,
}
