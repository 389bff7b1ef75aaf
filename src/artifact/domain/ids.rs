//! Identifier and validated scalar types for artifacts.

use super::ArtifactDomainError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum length for an uploaded filename.
const MAX_FILENAME_LENGTH: usize = 255;

/// Unique identifier for an uploaded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    /// Creates a new random artifact identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an artifact identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<Uuid> for ArtifactId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for ArtifactId {
    type Err = ArtifactDomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| ArtifactDomainError::InvalidArtifactId(value.to_owned()))
    }
}

/// Filename supplied by the client at upload time.
///
/// Only the final path component is kept, so `models/is_even.pkl` is stored
/// as `is_even.pkl`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactFilename(String);

impl ArtifactFilename {
    /// Creates a validated filename.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactDomainError`] when the name is empty or too long.
    pub fn new(value: impl Into<String>) -> Result<Self, ArtifactDomainError> {
        let raw = value.into();
        let base_name = raw
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_owned();

        if base_name.is_empty() {
            return Err(ArtifactDomainError::EmptyFilename);
        }

        if base_name.chars().count() > MAX_FILENAME_LENGTH {
            return Err(ArtifactDomainError::FilenameTooLong(base_name));
        }

        Ok(Self(base_name))
    }

    /// Returns the filename as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ArtifactFilename {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ArtifactFilename {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Opaque handle naming where an artifact store keeps the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactLocation(String);

impl ArtifactLocation {
    /// Creates a storage location handle.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactDomainError::EmptyLocation`] for blank handles.
    pub fn new(value: impl Into<String>) -> Result<Self, ArtifactDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(ArtifactDomainError::EmptyLocation);
        }
        Ok(Self(normalized))
    }

    /// Returns the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Lowercase hexadecimal SHA-256 digest of an artifact payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Computes the digest of `contents`.
    #[must_use]
    pub fn of(contents: &[u8]) -> Self {
        let digest = Sha256::digest(contents);
        Self(digest.iter().map(|byte| format!("{byte:02x}")).collect())
    }

    /// Returns the digest as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
