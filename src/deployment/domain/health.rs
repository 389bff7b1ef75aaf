//! Health probe outcomes.

use serde::{Deserialize, Serialize};

/// Result of a single health probe against an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HealthProbe {
    /// The health endpoint answered successfully.
    Healthy,
    /// The instance process has exited on its own.
    Exited {
        /// Output captured from the instance before it exited.
        logs: String,
    },
    /// The instance is running but its health endpoint did not answer.
    Unreachable {
        /// Why the probe failed.
        reason: String,
    },
}

impl HealthProbe {
    /// Creates an `exited` probe result.
    #[must_use]
    pub fn exited(logs: impl Into<String>) -> Self {
        Self::Exited { logs: logs.into() }
    }

    /// Creates an `unreachable` probe result.
    #[must_use]
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
        }
    }

    /// Returns whether the probe succeeded.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}
