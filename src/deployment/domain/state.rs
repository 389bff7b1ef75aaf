//! Deployment state machine.

use super::ParseDeploymentStateError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a deployment.
///
/// `Building -> Starting -> HealthChecking -> Running` is the happy path.
/// Every pre-running state may fall to `Failed`; a running deployment moves
/// to `TearingDown` and returns to `Running` when teardown fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    /// An image is being built from the artifact.
    Building,
    /// A port is assigned and the instance is starting.
    Starting,
    /// The instance is up and its health endpoint is being polled.
    HealthChecking,
    /// The instance passed its health check and accepts requests.
    Running,
    /// The deployment failed; resources have been rolled back.
    Failed,
    /// The instance is being stopped and removed.
    TearingDown,
}

impl DeploymentState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Starting => "starting",
            Self::HealthChecking => "health_checking",
            Self::Running => "running",
            Self::Failed => "failed",
            Self::TearingDown => "tearing_down",
        }
    }

    /// Returns whether deployments in this state serve traffic and appear
    /// as deployed in listings.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns whether a deployment attempt is still in progress.
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::Building | Self::Starting | Self::HealthChecking)
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Building, Self::Starting | Self::Failed)
                | (Self::Starting, Self::HealthChecking | Self::Failed)
                | (Self::HealthChecking, Self::Running | Self::Failed)
                | (Self::Running, Self::TearingDown)
                | (Self::TearingDown, Self::Running | Self::Failed)
        )
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DeploymentState {
    type Error = ParseDeploymentStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "building" => Ok(Self::Building),
            "starting" => Ok(Self::Starting),
            "health_checking" => Ok(Self::HealthChecking),
            "running" => Ok(Self::Running),
            "failed" => Ok(Self::Failed),
            "tearing_down" => Ok(Self::TearingDown),
            _ => Err(ParseDeploymentStateError(value.to_owned())),
        }
    }
}
