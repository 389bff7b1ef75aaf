//! In-memory deployment registry.

use crate::artifact::domain::ArtifactId;
use crate::deployment::{
    domain::{DeploymentDomainError, DeploymentRecord, DeploymentState, InstanceHandle},
    ports::{DeploymentRegistry, DeploymentRegistryError, DeploymentRegistryResult},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
enum RegistryEntry {
    InFlight(DeploymentState),
    Live(DeploymentRecord),
}

impl RegistryEntry {
    const fn state(&self) -> DeploymentState {
        match self {
            Self::InFlight(state) => *state,
            Self::Live(record) => record.state(),
        }
    }
}

/// Thread-safe in-memory deployment registry.
///
/// Every operation takes the lock once and releases it before returning,
/// so check-and-insert sequences are atomic and no lock is held across an
/// await point.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeploymentRegistry {
    state: Arc<RwLock<HashMap<ArtifactId, RegistryEntry>>>,
}

impl InMemoryDeploymentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(
        &self,
    ) -> DeploymentRegistryResult<RwLockReadGuard<'_, HashMap<ArtifactId, RegistryEntry>>> {
        self.state.read().map_err(|err| {
            DeploymentRegistryError::storage(std::io::Error::other(err.to_string()))
        })
    }

    fn write(
        &self,
    ) -> DeploymentRegistryResult<RwLockWriteGuard<'_, HashMap<ArtifactId, RegistryEntry>>> {
        self.state.write().map_err(|err| {
            DeploymentRegistryError::storage(std::io::Error::other(err.to_string()))
        })
    }
}

#[async_trait]
impl DeploymentRegistry for InMemoryDeploymentRegistry {
    async fn reserve(&self, artifact_id: ArtifactId) -> DeploymentRegistryResult<()> {
        let mut state = self.write()?;
        if let Some(existing) = state.get(&artifact_id) {
            return Err(DeploymentRegistryError::Conflict {
                artifact_id,
                state: existing.state(),
            });
        }
        state.insert(
            artifact_id,
            RegistryEntry::InFlight(DeploymentState::Building),
        );
        Ok(())
    }

    async fn advance(
        &self,
        artifact_id: ArtifactId,
        target: DeploymentState,
    ) -> DeploymentRegistryResult<()> {
        let mut state = self.write()?;
        let Some(RegistryEntry::InFlight(current)) = state.get_mut(&artifact_id) else {
            return Err(DeploymentRegistryError::NotReserved(artifact_id));
        };
        if !current.can_transition_to(target) {
            return Err(DeploymentDomainError::InvalidStateTransition {
                from: current.as_str().to_owned(),
                to: target.as_str().to_owned(),
            }
            .into());
        }
        *current = target;
        Ok(())
    }

    async fn publish(&self, record: &DeploymentRecord) -> DeploymentRegistryResult<()> {
        let mut state = self.write()?;
        let artifact_id = record.artifact_id();
        let Some(RegistryEntry::InFlight(current)) = state.get(&artifact_id) else {
            return Err(DeploymentRegistryError::NotReserved(artifact_id));
        };
        if !current.can_transition_to(record.state()) {
            return Err(DeploymentDomainError::InvalidStateTransition {
                from: current.as_str().to_owned(),
                to: record.state().as_str().to_owned(),
            }
            .into());
        }
        state.insert(artifact_id, RegistryEntry::Live(record.clone()));
        Ok(())
    }

    async fn release(&self, artifact_id: ArtifactId) -> DeploymentRegistryResult<()> {
        let mut state = self.write()?;
        if matches!(state.get(&artifact_id), Some(RegistryEntry::InFlight(_))) {
            state.remove(&artifact_id);
        }
        Ok(())
    }

    async fn get(
        &self,
        artifact_id: ArtifactId,
    ) -> DeploymentRegistryResult<Option<DeploymentRecord>> {
        let state = self.read()?;
        Ok(match state.get(&artifact_id) {
            Some(RegistryEntry::Live(record)) if record.state().is_live() => Some(record.clone()),
            _ => None,
        })
    }

    async fn state_of(
        &self,
        artifact_id: ArtifactId,
    ) -> DeploymentRegistryResult<Option<DeploymentState>> {
        let state = self.read()?;
        Ok(state.get(&artifact_id).map(RegistryEntry::state))
    }

    async fn begin_teardown(
        &self,
        artifact_id: ArtifactId,
    ) -> DeploymentRegistryResult<DeploymentRecord> {
        let mut state = self.write()?;
        match state.get_mut(&artifact_id) {
            None => Err(DeploymentRegistryError::NotDeployed(artifact_id)),
            Some(RegistryEntry::InFlight(current)) => Err(DeploymentRegistryError::Conflict {
                artifact_id,
                state: *current,
            }),
            Some(RegistryEntry::Live(record)) => {
                if !record.state().is_live() {
                    return Err(DeploymentRegistryError::Conflict {
                        artifact_id,
                        state: record.state(),
                    });
                }
                record.begin_teardown()?;
                Ok(record.clone())
            }
        }
    }

    async fn abort_teardown(&self, artifact_id: ArtifactId) -> DeploymentRegistryResult<()> {
        let mut state = self.write()?;
        match state.get_mut(&artifact_id) {
            Some(RegistryEntry::Live(record)) => record.abort_teardown().map_err(Into::into),
            _ => Err(DeploymentRegistryError::NotDeployed(artifact_id)),
        }
    }

    async fn remove(
        &self,
        artifact_id: ArtifactId,
    ) -> DeploymentRegistryResult<Option<DeploymentRecord>> {
        let mut state = self.write()?;
        if !matches!(state.get(&artifact_id), Some(RegistryEntry::Live(_))) {
            return Ok(None);
        }
        Ok(match state.remove(&artifact_id) {
            Some(RegistryEntry::Live(record)) => Some(record),
            _ => None,
        })
    }

    async fn remove_if_instance(
        &self,
        artifact_id: ArtifactId,
        instance: &InstanceHandle,
    ) -> DeploymentRegistryResult<bool> {
        let mut state = self.write()?;
        let matches_instance = matches!(
            state.get(&artifact_id),
            Some(RegistryEntry::Live(record))
                if record.state().is_live() && record.instance() == instance
        );
        if matches_instance {
            state.remove(&artifact_id);
        }
        Ok(matches_instance)
    }

    async fn snapshot(&self) -> DeploymentRegistryResult<Vec<DeploymentRecord>> {
        let state = self.read()?;
        Ok(state
            .values()
            .filter_map(|entry| match entry {
                RegistryEntry::Live(record) if record.state().is_live() => Some(record.clone()),
                _ => None,
            })
            .collect())
    }
}
