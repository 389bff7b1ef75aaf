//! Live deployment record.

use super::{DeploymentDomainError, DeploymentState, ImageHandle, InstanceHandle, ServicePort};
use crate::artifact::domain::ArtifactId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Association between an artifact and its live instance.
///
/// Records only exist for deployments that passed their health check, so a
/// freshly created record is always `Running`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    artifact_id: ArtifactId,
    image: ImageHandle,
    instance: InstanceHandle,
    state: DeploymentState,
    deployed_at: DateTime<Utc>,
}

impl DeploymentRecord {
    /// Creates a running record for a health-checked instance.
    #[must_use]
    pub fn running(
        artifact_id: ArtifactId,
        image: ImageHandle,
        instance: InstanceHandle,
        clock: &impl Clock,
    ) -> Self {
        Self {
            artifact_id,
            image,
            instance,
            state: DeploymentState::Running,
            deployed_at: clock.utc(),
        }
    }

    /// Returns the deployed artifact identifier.
    #[must_use]
    pub const fn artifact_id(&self) -> ArtifactId {
        self.artifact_id
    }

    /// Returns the image the instance runs.
    #[must_use]
    pub const fn image(&self) -> &ImageHandle {
        &self.image
    }

    /// Returns the instance handle.
    #[must_use]
    pub const fn instance(&self) -> &InstanceHandle {
        &self.instance
    }

    /// Returns the port assigned to the instance.
    #[must_use]
    pub const fn port(&self) -> ServicePort {
        self.instance.port()
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> DeploymentState {
        self.state
    }

    /// Returns when the deployment became live.
    #[must_use]
    pub const fn deployed_at(&self) -> DateTime<Utc> {
        self.deployed_at
    }

    /// Marks the deployment as being torn down.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentDomainError::InvalidStateTransition`] unless the
    /// deployment is running.
    pub fn begin_teardown(&mut self) -> Result<(), DeploymentDomainError> {
        self.transition_to(DeploymentState::TearingDown)
    }

    /// Returns a deployment whose teardown failed to the running state.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentDomainError::InvalidStateTransition`] unless the
    /// deployment is tearing down.
    pub fn abort_teardown(&mut self) -> Result<(), DeploymentDomainError> {
        self.transition_to(DeploymentState::Running)
    }

    fn transition_to(&mut self, target: DeploymentState) -> Result<(), DeploymentDomainError> {
        if !self.state.can_transition_to(target) {
            return Err(DeploymentDomainError::InvalidStateTransition {
                from: self.state.as_str().to_owned(),
                to: target.as_str().to_owned(),
            });
        }

        self.state = target;
        Ok(())
    }
}
