//! Shared fixtures for deployment unit tests.

use crate::artifact::{
    adapters::memory::{InMemoryArtifactRepository, InMemoryArtifactStore},
    domain::ArtifactId,
    services::{ArtifactService, UploadArtifactRequest},
};
use crate::deployment::{
    adapters::memory::{InMemoryDeploymentRegistry, InMemoryInstanceRuntime},
    domain::{
        DeploymentRecord, DeploymentState, ImageHandle, InstanceHandle, PortRange, ServicePort,
    },
    ports::DeploymentRegistry,
    services::{DeployPolicy, DeploymentOrchestrator, HealthCheckPolicy, PortAllocator},
};
use mockable::DefaultClock;
use std::sync::Arc;
use std::time::Duration;

pub(super) type TestArtifacts =
    ArtifactService<InMemoryArtifactRepository, InMemoryArtifactStore, DefaultClock>;

pub(super) type TestOrchestrator = DeploymentOrchestrator<
    InMemoryArtifactRepository,
    InMemoryArtifactStore,
    InMemoryDeploymentRegistry,
    InMemoryInstanceRuntime,
    DefaultClock,
>;

pub(super) const BASE_PORT: u16 = 8100;

pub(super) fn fast_policy() -> DeployPolicy {
    DeployPolicy {
        health_check: HealthCheckPolicy {
            max_attempts: 3,
            interval: Duration::from_millis(10),
            probe_timeout: Duration::from_millis(50),
        },
        deploy_timeout: Duration::from_secs(5),
        instance_prefix: "test".to_owned(),
    }
}

pub(super) struct Harness {
    pub artifacts: TestArtifacts,
    pub registry: Arc<InMemoryDeploymentRegistry>,
    pub runtime: Arc<InMemoryInstanceRuntime>,
    pub ports: Arc<PortAllocator>,
    pub orchestrator: TestOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_capacity(8)
    }

    pub fn with_capacity(capacity: u16) -> Self {
        let clock = Arc::new(DefaultClock);
        let artifacts = ArtifactService::new(
            Arc::new(InMemoryArtifactRepository::new()),
            Arc::new(InMemoryArtifactStore::new()),
            Arc::clone(&clock),
        );
        let registry = Arc::new(InMemoryDeploymentRegistry::new());
        let runtime = Arc::new(InMemoryInstanceRuntime::new());
        let range = PortRange::new(BASE_PORT, capacity).expect("valid port range");
        let ports = Arc::new(PortAllocator::new(range));
        let orchestrator = DeploymentOrchestrator::new(
            artifacts.clone(),
            Arc::clone(&registry),
            Arc::clone(&runtime),
            Arc::clone(&ports),
            clock,
            fast_policy(),
        );
        Self {
            artifacts,
            registry,
            runtime,
            ports,
            orchestrator,
        }
    }

    pub async fn upload(&self, filename: &str) -> ArtifactId {
        self.artifacts
            .upload(UploadArtifactRequest::new(filename, b"opaque-model".to_vec()))
            .await
            .expect("upload should succeed")
            .id()
    }

    pub fn assert_no_leaks(&self) {
        assert_eq!(self.ports.in_use(), 0, "no port should stay assigned");
        assert_eq!(self.runtime.instance_count(), 0, "no instance should remain");
    }
}

pub(super) fn port(value: u16) -> ServicePort {
    ServicePort::new(value).expect("valid port")
}

pub(super) fn running_record(artifact_id: ArtifactId, port_value: u16) -> DeploymentRecord {
    let instance = InstanceHandle::for_deployment("test", artifact_id, port(port_value))
        .expect("valid instance handle");
    let image = ImageHandle::new(format!("image-{artifact_id}")).expect("valid image handle");
    DeploymentRecord::running(artifact_id, image, instance, &DefaultClock)
}

/// Walks a reservation through the happy path and publishes `record`.
pub(super) async fn publish_running<R: DeploymentRegistry>(registry: &R, record: &DeploymentRecord) {
    let artifact_id = record.artifact_id();
    registry.reserve(artifact_id).await.expect("reserve");
    registry
        .advance(artifact_id, DeploymentState::Starting)
        .await
        .expect("advance to starting");
    registry
        .advance(artifact_id, DeploymentState::HealthChecking)
        .await
        .expect("advance to health checking");
    registry.publish(record).await.expect("publish");
}
