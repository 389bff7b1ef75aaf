//! Opaque handles for runtime images and instances.

use super::{DeploymentDomainError, ServicePort};
use crate::artifact::domain::ArtifactId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Reference to a runnable image produced by the instance runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageHandle(String);

impl ImageHandle {
    /// Creates an image handle.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentDomainError::EmptyImageHandle`] for blank values.
    pub fn new(value: impl Into<String>) -> Result<Self, DeploymentDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(DeploymentDomainError::EmptyImageHandle);
        }
        Ok(Self(normalized))
    }

    /// Returns the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Reference to a running (or once-running) instance and the host port it
/// was bound to.
///
/// The orchestrator names instances before asking the runtime to start
/// them, so a start that never returns can still be cleaned up by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceHandle {
    name: String,
    port: ServicePort,
}

impl InstanceHandle {
    /// Creates an instance handle.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentDomainError::EmptyInstanceName`] for blank names.
    pub fn new(name: impl Into<String>, port: ServicePort) -> Result<Self, DeploymentDomainError> {
        let normalized = name.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(DeploymentDomainError::EmptyInstanceName);
        }
        Ok(Self {
            name: normalized,
            port,
        })
    }

    /// Builds a `<prefix>-<artifact>-<port>-<nonce>` handle.
    ///
    /// The nonce is fresh for every call, so redeploying an artifact on the
    /// port it held before still yields a handle distinct from the old one.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentDomainError::EmptyInstanceName`] when the result
    /// would be blank.
    pub fn for_deployment(
        prefix: &str,
        artifact_id: ArtifactId,
        port: ServicePort,
    ) -> Result<Self, DeploymentDomainError> {
        let (nonce, _, _, _) = Uuid::new_v4().as_fields();
        let trimmed_prefix = prefix.trim();
        let name = if trimmed_prefix.is_empty() {
            format!("{artifact_id}-{port}-{nonce:08x}")
        } else {
            format!("{trimmed_prefix}-{artifact_id}-{port}-{nonce:08x}")
        };
        Self::new(name, port)
    }

    /// Returns the instance name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the host port the instance is bound to.
    #[must_use]
    pub const fn port(&self) -> ServicePort {
        self.port
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}@{}", self.name, self.port)
    }
}
