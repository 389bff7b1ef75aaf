//! Registry port tracking live and in-flight deployments.

use crate::artifact::domain::ArtifactId;
use crate::deployment::domain::{
    DeploymentDomainError, DeploymentRecord, DeploymentState, InstanceHandle,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for deployment registry operations.
pub type DeploymentRegistryResult<T> = Result<T, DeploymentRegistryError>;

/// Source of truth for which artifacts are deployed, on which port, and in
/// what state.
///
/// Each artifact has at most one entry. An entry is either an in-flight
/// reservation (a deploy attempt in progress) or a published record.
/// Implementations must make every method atomic with respect to the others
/// for the same artifact and must not hold locks across await points.
#[async_trait]
pub trait DeploymentRegistry: Send + Sync {
    /// Atomically checks that no entry exists and reserves one in the
    /// `Building` state.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentRegistryError::Conflict`] when the artifact is
    /// already deployed or has a deploy or teardown in flight.
    async fn reserve(&self, artifact_id: ArtifactId) -> DeploymentRegistryResult<()>;

    /// Moves a reservation to the next state.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentRegistryError::NotReserved`] when no reservation
    /// exists, or [`DeploymentRegistryError::Domain`] for an invalid
    /// transition.
    async fn advance(
        &self,
        artifact_id: ArtifactId,
        state: DeploymentState,
    ) -> DeploymentRegistryResult<()>;

    /// Replaces the reservation for the record's artifact with the running
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentRegistryError::NotReserved`] when no reservation
    /// exists for the artifact.
    async fn publish(&self, record: &DeploymentRecord) -> DeploymentRegistryResult<()>;

    /// Drops a reservation after a failed deploy attempt. Published records
    /// are left untouched.
    async fn release(&self, artifact_id: ArtifactId) -> DeploymentRegistryResult<()>;

    /// Returns the running record for an artifact.
    async fn get(&self, artifact_id: ArtifactId)
    -> DeploymentRegistryResult<Option<DeploymentRecord>>;

    /// Returns the state of any entry for an artifact.
    async fn state_of(
        &self,
        artifact_id: ArtifactId,
    ) -> DeploymentRegistryResult<Option<DeploymentState>>;

    /// Atomically moves a running record to `TearingDown` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentRegistryError::NotDeployed`] when no record
    /// exists, or [`DeploymentRegistryError::Conflict`] when a deploy or
    /// teardown is already in flight.
    async fn begin_teardown(
        &self,
        artifact_id: ArtifactId,
    ) -> DeploymentRegistryResult<DeploymentRecord>;

    /// Returns a record whose teardown failed to `Running`.
    async fn abort_teardown(&self, artifact_id: ArtifactId) -> DeploymentRegistryResult<()>;

    /// Removes a published record, returning it.
    async fn remove(&self, artifact_id: ArtifactId)
    -> DeploymentRegistryResult<Option<DeploymentRecord>>;

    /// Removes a running record only if it still refers to `instance`.
    ///
    /// Returns whether a record was removed.
    async fn remove_if_instance(
        &self,
        artifact_id: ArtifactId,
        instance: &InstanceHandle,
    ) -> DeploymentRegistryResult<bool>;

    /// Returns a point-in-time copy of every running record.
    async fn snapshot(&self) -> DeploymentRegistryResult<Vec<DeploymentRecord>>;
}

/// Errors returned by deployment registry implementations.
#[derive(Debug, Clone, Error)]
pub enum DeploymentRegistryError {
    /// The artifact already has a deployment or one is in flight.
    #[error("artifact {artifact_id} already has a deployment in state {state}")]
    Conflict {
        /// Artifact identifier.
        artifact_id: ArtifactId,
        /// State of the existing entry.
        state: DeploymentState,
    },

    /// The artifact has no running deployment.
    #[error("artifact {0} is not deployed")]
    NotDeployed(ArtifactId),

    /// The artifact has no in-flight reservation.
    #[error("artifact {0} has no deployment reservation")]
    NotReserved(ArtifactId),

    /// A state transition was rejected.
    #[error(transparent)]
    Domain(#[from] DeploymentDomainError),

    /// Storage-layer failure.
    #[error("deployment registry error: {0}")]
    Storage(Arc<dyn std::error::Error + Send + Sync>),
}

impl DeploymentRegistryError {
    /// Wraps a storage-layer failure.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Arc::new(err))
    }
}
