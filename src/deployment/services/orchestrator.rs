//! Deployment lifecycle orchestration.
//!
//! Drives an artifact from upload to a health-checked running instance,
//! tears deployments down, and reconciles the registry against the runtime.

use super::health_check::{HealthCheckOutcome, HealthCheckPolicy, await_healthy};
use super::port_allocator::{PortAllocator, PortAllocatorError};
use crate::artifact::{
    domain::{ArtifactId, ArtifactRecord},
    ports::{ArtifactRepository, ArtifactStore},
    services::{ArtifactService, ArtifactServiceError},
};
use crate::deployment::{
    domain::{
        ArtifactStatus, DeploymentDomainError, DeploymentRecord, DeploymentState, InstanceHandle,
        ServicePort,
    },
    ports::{
        DeploymentRegistry, DeploymentRegistryError, ImageBuildRequest, InstanceRuntime,
        InstanceRuntimeError,
    },
};
use mockable::Clock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

/// Default prefix for instance names.
pub const DEFAULT_INSTANCE_PREFIX: &str = "gropius";

/// Tunables for deploy attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployPolicy {
    /// Health polling schedule.
    pub health_check: HealthCheckPolicy,
    /// Upper bound on build, start, and health check together.
    pub deploy_timeout: Duration,
    /// Prefix for instance names.
    pub instance_prefix: String,
}

impl Default for DeployPolicy {
    fn default() -> Self {
        Self {
            health_check: HealthCheckPolicy::default(),
            deploy_timeout: Duration::from_secs(120),
            instance_prefix: DEFAULT_INSTANCE_PREFIX.to_owned(),
        }
    }
}

/// Service-level errors for deployment operations.
#[derive(Debug, Error)]
pub enum DeploymentServiceError {
    /// No artifact exists with the given identifier.
    #[error("artifact {0} not found")]
    NotFound(ArtifactId),

    /// The artifact has no running deployment.
    #[error("artifact {0} is not deployed")]
    NotDeployed(ArtifactId),

    /// The artifact is already deployed or a deploy or teardown is in flight.
    #[error("artifact {artifact_id} already has a deployment in state {state}")]
    Conflict {
        /// Artifact identifier.
        artifact_id: ArtifactId,
        /// State of the existing deployment.
        state: DeploymentState,
    },

    /// The runtime failed to build an image.
    #[error("failed to build image for artifact {artifact_id}: {source}")]
    BuildFailure {
        /// Artifact identifier.
        artifact_id: ArtifactId,
        /// Runtime failure.
        #[source]
        source: InstanceRuntimeError,
    },

    /// The runtime failed to start an instance.
    #[error("failed to start instance for artifact {artifact_id} on port {port}: {source}")]
    StartFailure {
        /// Artifact identifier.
        artifact_id: ArtifactId,
        /// Port the instance was to bind.
        port: ServicePort,
        /// Runtime failure.
        #[source]
        source: InstanceRuntimeError,
    },

    /// The instance never became healthy.
    #[error("artifact {artifact_id} did not become healthy after {attempts} probes: {reason}")]
    HealthCheckTimeout {
        /// Artifact identifier.
        artifact_id: ArtifactId,
        /// Probes issued.
        attempts: u32,
        /// Why the check ended.
        reason: String,
        /// Output captured when the instance exited.
        logs: Option<String>,
    },

    /// Build, start, and health check together exceeded the deploy timeout.
    #[error("deployment of artifact {artifact_id} exceeded {} ms", .timeout.as_millis())]
    DeployTimeout {
        /// Artifact identifier.
        artifact_id: ArtifactId,
        /// Configured deploy timeout.
        timeout: Duration,
    },

    /// No port is free for a new instance.
    #[error("no free port for artifact {artifact_id}: all {capacity} ports are assigned")]
    ResourceExhausted {
        /// Artifact identifier.
        artifact_id: ArtifactId,
        /// Size of the port range.
        capacity: u16,
    },

    /// Stopping or removing an instance failed; the deployment stays running.
    #[error("failed to tear down artifact {artifact_id}: {source}")]
    TeardownFailure {
        /// Artifact identifier.
        artifact_id: ArtifactId,
        /// Runtime failure.
        #[source]
        source: InstanceRuntimeError,
    },

    /// The task driving a deploy or teardown ended without an outcome.
    #[error("{operation} of artifact {artifact_id} was interrupted: {source}")]
    Interrupted {
        /// Artifact identifier.
        artifact_id: ArtifactId,
        /// Operation that was running.
        operation: &'static str,
        /// Task failure.
        #[source]
        source: JoinError,
    },

    /// Artifact service failure.
    #[error(transparent)]
    Artifact(ArtifactServiceError),

    /// Deployment domain validation failed.
    #[error(transparent)]
    Domain(#[from] DeploymentDomainError),

    /// Registry failure.
    #[error(transparent)]
    Registry(DeploymentRegistryError),
}

impl DeploymentServiceError {
    /// Returns the artifact the error concerns, when known.
    #[must_use]
    pub const fn artifact_id(&self) -> Option<ArtifactId> {
        match self {
            Self::NotFound(artifact_id)
            | Self::NotDeployed(artifact_id)
            | Self::Conflict { artifact_id, .. }
            | Self::BuildFailure { artifact_id, .. }
            | Self::StartFailure { artifact_id, .. }
            | Self::HealthCheckTimeout { artifact_id, .. }
            | Self::DeployTimeout { artifact_id, .. }
            | Self::ResourceExhausted { artifact_id, .. }
            | Self::TeardownFailure { artifact_id, .. }
            | Self::Interrupted { artifact_id, .. } => Some(*artifact_id),
            Self::Artifact(_) | Self::Domain(_) | Self::Registry(_) => None,
        }
    }
}

impl From<ArtifactServiceError> for DeploymentServiceError {
    fn from(err: ArtifactServiceError) -> Self {
        match err {
            ArtifactServiceError::NotFound(artifact_id) => Self::NotFound(artifact_id),
            other => Self::Artifact(other),
        }
    }
}

impl From<DeploymentRegistryError> for DeploymentServiceError {
    fn from(err: DeploymentRegistryError) -> Self {
        match err {
            DeploymentRegistryError::Conflict { artifact_id, state } => {
                Self::Conflict { artifact_id, state }
            }
            DeploymentRegistryError::NotDeployed(artifact_id) => Self::NotDeployed(artifact_id),
            other => Self::Registry(other),
        }
    }
}

/// Result type for deployment service operations.
pub type DeploymentServiceResult<T> = Result<T, DeploymentServiceError>;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Running records checked against the runtime.
    pub checked: usize,
    /// Artifacts whose records were removed because their instance stopped.
    pub removed: Vec<ArtifactId>,
    /// Artifacts whose liveness could not be determined; their records
    /// were kept.
    pub unverified: Vec<ArtifactId>,
}

#[derive(Debug, Default)]
enum InstanceSlot {
    #[default]
    Vacant,
    Starting(InstanceHandle),
    Started(InstanceHandle),
}

/// Resources a deploy attempt holds and must give back if it fails.
#[derive(Debug, Default)]
struct Acquired {
    port: Option<ServicePort>,
    instance: InstanceSlot,
}

/// Deploys, tears down, and reconciles artifact deployments.
///
/// Registry operations are atomic per artifact, so concurrent calls for
/// the same artifact are serialized by `reserve` and `begin_teardown`
/// while different artifacts proceed in parallel.
pub struct DeploymentOrchestrator<A, S, D, R, C>
where
    A: ArtifactRepository,
    S: ArtifactStore,
    D: DeploymentRegistry,
    R: InstanceRuntime,
    C: Clock + Send + Sync,
{
    artifacts: ArtifactService<A, S, C>,
    registry: Arc<D>,
    runtime: Arc<R>,
    ports: Arc<PortAllocator>,
    clock: Arc<C>,
    policy: DeployPolicy,
}

impl<A, S, D, R, C> Clone for DeploymentOrchestrator<A, S, D, R, C>
where
    A: ArtifactRepository,
    S: ArtifactStore,
    D: DeploymentRegistry,
    R: InstanceRuntime,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            artifacts: self.artifacts.clone(),
            registry: Arc::clone(&self.registry),
            runtime: Arc::clone(&self.runtime),
            ports: Arc::clone(&self.ports),
            clock: Arc::clone(&self.clock),
            policy: self.policy.clone(),
        }
    }
}

impl<A, S, D, R, C> DeploymentOrchestrator<A, S, D, R, C>
where
    A: ArtifactRepository + 'static,
    S: ArtifactStore + 'static,
    D: DeploymentRegistry + 'static,
    R: InstanceRuntime + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates an orchestrator.
    #[must_use]
    pub const fn new(
        artifacts: ArtifactService<A, S, C>,
        registry: Arc<D>,
        runtime: Arc<R>,
        ports: Arc<PortAllocator>,
        clock: Arc<C>,
        policy: DeployPolicy,
    ) -> Self {
        Self {
            artifacts,
            registry,
            runtime,
            ports,
            clock,
            policy,
        }
    }

    /// Returns the deploy policy.
    #[must_use]
    pub const fn policy(&self) -> &DeployPolicy {
        &self.policy
    }

    /// Builds, starts, and health-checks an instance for an artifact, then
    /// publishes its record.
    ///
    /// The attempt runs on its own task: any failure after a port or
    /// instance was acquired releases both, even when the caller stops
    /// waiting for the result.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentServiceError::NotFound`] for unknown artifacts,
    /// [`DeploymentServiceError::Conflict`] when a deployment exists or is
    /// in flight, and the build, start, health-check, timeout, or port
    /// exhaustion variants when bring-up fails.
    pub async fn deploy(&self, artifact_id: ArtifactId) -> DeploymentServiceResult<DeploymentRecord> {
        let artifact = self.artifacts.get(artifact_id).await?;
        let worker = self.clone();
        run_detached(artifact_id, "deployment", async move {
            worker.attempt_deploy(artifact).await
        })
        .await
    }

    async fn attempt_deploy(
        &self,
        artifact: ArtifactRecord,
    ) -> DeploymentServiceResult<DeploymentRecord> {
        let artifact_id = artifact.id();
        self.registry.reserve(artifact_id).await?;
        debug!(artifact_id = %artifact_id, "deployment reserved");

        let mut acquired = Acquired::default();
        let timeout = self.policy.deploy_timeout;
        let bring_up = tokio::time::timeout(timeout, self.bring_up(&artifact, &mut acquired)).await;
        let published = match bring_up {
            Ok(Ok(record)) => match self.registry.publish(&record).await {
                Ok(()) => Ok(record),
                Err(err) => Err(err.into()),
            },
            Ok(Err(err)) => Err(err),
            Err(_) => Err(DeploymentServiceError::DeployTimeout {
                artifact_id,
                timeout,
            }),
        };

        match published {
            Ok(record) => {
                info!(
                    artifact_id = %artifact_id,
                    port = record.port().get(),
                    instance = record.instance().name(),
                    "deployment running"
                );
                Ok(record)
            }
            Err(err) => {
                self.roll_back(artifact_id, acquired, &err).await;
                Err(err)
            }
        }
    }

    async fn bring_up(
        &self,
        artifact: &ArtifactRecord,
        acquired: &mut Acquired,
    ) -> DeploymentServiceResult<DeploymentRecord> {
        let artifact_id = artifact.id();
        let contents = self.artifacts.load_contents(artifact).await?;
        let request = ImageBuildRequest {
            artifact_id,
            filename: artifact.filename().clone(),
            contents,
        };
        let image = self
            .runtime
            .build(&request)
            .await
            .map_err(|source| DeploymentServiceError::BuildFailure {
                artifact_id,
                source,
            })?;
        debug!(artifact_id = %artifact_id, image = %image, "image ready");

        self.registry
            .advance(artifact_id, DeploymentState::Starting)
            .await?;
        let port = self.ports.allocate().map_err(|err| match err {
            PortAllocatorError::Exhausted { capacity } => {
                DeploymentServiceError::ResourceExhausted {
                    artifact_id,
                    capacity,
                }
            }
        })?;
        acquired.port = Some(port);

        let instance =
            InstanceHandle::for_deployment(&self.policy.instance_prefix, artifact_id, port)?;
        acquired.instance = InstanceSlot::Starting(instance.clone());
        info!(
            artifact_id = %artifact_id,
            port = port.get(),
            instance = instance.name(),
            "starting instance"
        );
        self.runtime
            .start(&image, &instance)
            .await
            .map_err(|source| DeploymentServiceError::StartFailure {
                artifact_id,
                port,
                source,
            })?;
        acquired.instance = InstanceSlot::Started(instance.clone());

        self.registry
            .advance(artifact_id, DeploymentState::HealthChecking)
            .await?;
        match await_healthy(&*self.runtime, &instance, &self.policy.health_check).await {
            HealthCheckOutcome::Healthy { attempts } => {
                debug!(artifact_id = %artifact_id, attempts, "instance healthy");
            }
            HealthCheckOutcome::Exited { attempts, logs } => {
                return Err(DeploymentServiceError::HealthCheckTimeout {
                    artifact_id,
                    attempts,
                    reason: "instance exited before becoming healthy".to_owned(),
                    logs: Some(logs),
                });
            }
            HealthCheckOutcome::TimedOut {
                attempts,
                last_reason,
            } => {
                return Err(DeploymentServiceError::HealthCheckTimeout {
                    artifact_id,
                    attempts,
                    reason: last_reason,
                    logs: None,
                });
            }
        }

        Ok(DeploymentRecord::running(
            artifact_id,
            image,
            instance,
            &*self.clock,
        ))
    }

    async fn roll_back(
        &self,
        artifact_id: ArtifactId,
        acquired: Acquired,
        cause: &DeploymentServiceError,
    ) {
        warn!(artifact_id = %artifact_id, error = %cause, "deployment failed, rolling back");

        if let Err(err) = self
            .registry
            .advance(artifact_id, DeploymentState::Failed)
            .await
        {
            debug!(artifact_id = %artifact_id, error = %err, "could not mark deployment failed");
        }
        match acquired.instance {
            InstanceSlot::Vacant => {}
            InstanceSlot::Starting(instance) => self.discard_instance(&instance, false).await,
            InstanceSlot::Started(instance) => self.discard_instance(&instance, true).await,
        }
        if let Some(port) = acquired.port {
            self.ports.release(port);
        }
        if let Err(err) = self.registry.release(artifact_id).await {
            warn!(artifact_id = %artifact_id, error = %err, "failed to release deployment reservation");
        }
    }

    async fn discard_instance(&self, instance: &InstanceHandle, started: bool) {
        let stopped = self.runtime.stop(instance).await;
        let removed = self.runtime.remove(instance).await;
        for (step, result) in [("stop", stopped), ("remove", removed)] {
            match result {
                Ok(()) => debug!(instance = instance.name(), step, "instance cleanup step done"),
                Err(err) if started => {
                    warn!(instance = instance.name(), step, error = %err, "instance cleanup failed");
                }
                Err(err) => {
                    debug!(instance = instance.name(), step, error = %err, "instance cleanup skipped");
                }
            }
        }
    }

    /// Stops and removes the instance of a running deployment, then drops
    /// its record and frees its port.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentServiceError::NotDeployed`] when no running
    /// deployment exists, [`DeploymentServiceError::Conflict`] when another
    /// teardown is in flight, or [`DeploymentServiceError::TeardownFailure`]
    /// when the runtime fails; the deployment then stays running. Like
    /// [`Self::deploy`], the teardown completes even if the caller stops
    /// waiting.
    pub async fn teardown(
        &self,
        artifact_id: ArtifactId,
    ) -> DeploymentServiceResult<DeploymentRecord> {
        let worker = self.clone();
        run_detached(artifact_id, "teardown", async move {
            worker.attempt_teardown(artifact_id).await
        })
        .await
    }

    async fn attempt_teardown(
        &self,
        artifact_id: ArtifactId,
    ) -> DeploymentServiceResult<DeploymentRecord> {
        let record = self.registry.begin_teardown(artifact_id).await?;
        info!(
            artifact_id = %artifact_id,
            port = record.port().get(),
            instance = record.instance().name(),
            "tearing down deployment"
        );

        if let Err(source) = self.stop_and_remove(record.instance()).await {
            warn!(artifact_id = %artifact_id, error = %source, "teardown failed, deployment kept");
            self.registry.abort_teardown(artifact_id).await?;
            return Err(DeploymentServiceError::TeardownFailure {
                artifact_id,
                source,
            });
        }

        let removed = self.registry.remove(artifact_id).await?.unwrap_or(record);
        self.ports.release(removed.port());
        info!(artifact_id = %artifact_id, port = removed.port().get(), "deployment removed");
        Ok(removed)
    }

    async fn stop_and_remove(&self, instance: &InstanceHandle) -> Result<(), InstanceRuntimeError> {
        tolerate_unknown(self.runtime.stop(instance).await)?;
        tolerate_unknown(self.runtime.remove(instance).await)
    }

    /// Drops running records whose instance is no longer running and frees
    /// their ports.
    ///
    /// Liveness is checked against a snapshot; a record is only removed if
    /// it still refers to the instance that was checked.
    ///
    /// # Errors
    ///
    /// Returns registry errors. Runtime errors leave the record in place.
    pub async fn reconcile(&self) -> DeploymentServiceResult<ReconciliationReport> {
        let snapshot = self.registry.snapshot().await?;
        let mut report = ReconciliationReport {
            checked: snapshot.len(),
            ..ReconciliationReport::default()
        };

        for record in snapshot {
            let artifact_id = record.artifact_id();
            match self.runtime.is_running(record.instance()).await {
                Ok(true) => {}
                Ok(false) => {
                    if !self
                        .registry
                        .remove_if_instance(artifact_id, record.instance())
                        .await?
                    {
                        continue;
                    }
                    self.ports.release(record.port());
                    if let Err(err) = self.runtime.remove(record.instance()).await {
                        debug!(artifact_id = %artifact_id, error = %err, "stale instance not removed");
                    }
                    info!(
                        artifact_id = %artifact_id,
                        port = record.port().get(),
                        "removed deployment whose instance stopped"
                    );
                    report.removed.push(artifact_id);
                }
                Err(err) => {
                    warn!(artifact_id = %artifact_id, error = %err, "could not check instance liveness");
                    report.unverified.push(artifact_id);
                }
            }
        }

        Ok(report)
    }

    /// Lists every uploaded artifact with its deployment status, after a
    /// reconciliation pass.
    ///
    /// # Errors
    ///
    /// Returns artifact or registry errors.
    pub async fn list(&self) -> DeploymentServiceResult<Vec<ArtifactStatus>> {
        let report = self.reconcile().await?;
        debug!(
            checked = report.checked,
            removed = report.removed.len(),
            "registry reconciled"
        );

        let running: HashMap<ArtifactId, ServicePort> = self
            .registry
            .snapshot()
            .await?
            .into_iter()
            .map(|record| (record.artifact_id(), record.port()))
            .collect();
        let artifacts = self.artifacts.list().await?;

        Ok(artifacts
            .into_iter()
            .map(|artifact| {
                let port = running.get(&artifact.id()).copied();
                ArtifactStatus {
                    artifact_id: artifact.id(),
                    filename: artifact.filename().clone(),
                    deployed: port.is_some(),
                    port,
                }
            })
            .collect())
    }

    /// Returns the running deployment of an artifact.
    ///
    /// # Errors
    ///
    /// Returns registry errors.
    pub async fn deployment(
        &self,
        artifact_id: ArtifactId,
    ) -> DeploymentServiceResult<Option<DeploymentRecord>> {
        Ok(self.registry.get(artifact_id).await?)
    }

    /// Tears down every running deployment, logging failures.
    ///
    /// Returns the records that were removed.
    ///
    /// # Errors
    ///
    /// Returns registry errors raised while taking the snapshot.
    pub async fn teardown_all(&self) -> DeploymentServiceResult<Vec<DeploymentRecord>> {
        let snapshot = self.registry.snapshot().await?;
        let mut removed = Vec::with_capacity(snapshot.len());
        for record in snapshot {
            match self.teardown(record.artifact_id()).await {
                Ok(torn_down) => removed.push(torn_down),
                Err(err) => {
                    warn!(artifact_id = %record.artifact_id(), error = %err, "teardown during shutdown failed");
                }
            }
        }
        Ok(removed)
    }
}

/// Runs `task` on its own tokio task and waits for it.
///
/// Dropping the returned future leaves the task running to completion.
async fn run_detached<T, F>(
    artifact_id: ArtifactId,
    operation: &'static str,
    task: F,
) -> DeploymentServiceResult<T>
where
    T: Send + 'static,
    F: Future<Output = DeploymentServiceResult<T>> + Send + 'static,
{
    tokio::spawn(task).await.unwrap_or_else(|source| {
        Err(DeploymentServiceError::Interrupted {
            artifact_id,
            operation,
            source,
        })
    })
}

fn tolerate_unknown(result: Result<(), InstanceRuntimeError>) -> Result<(), InstanceRuntimeError> {
    match result {
        Err(InstanceRuntimeError::UnknownInstance(name)) => {
            debug!(instance = %name, "instance already gone");
            Ok(())
        }
        other => other,
    }
}
