//! Error types for artifact domain validation.

use thiserror::Error;

/// Errors returned while constructing artifact domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArtifactDomainError {
    /// The uploaded filename is empty after trimming.
    #[error("artifact filename must not be empty")]
    EmptyFilename,

    /// The uploaded filename exceeds the 255-character limit.
    #[error("artifact filename exceeds 255 character limit: {0}")]
    FilenameTooLong(String),

    /// The uploaded payload contains no bytes.
    #[error("artifact payload must not be empty")]
    EmptyPayload,

    /// The storage location handle is empty.
    #[error("artifact location must not be empty")]
    EmptyLocation,

    /// An artifact identifier could not be parsed.
    #[error("invalid artifact identifier: {0}")]
    InvalidArtifactId(String),
}
