//! Boundary surface over the artifact and deployment services.
//!
//! [`DeploymentApi`] is what a request-routing layer calls: it accepts
//! artifact identifiers as strings, returns serializable values, and
//! classifies every failure with an [`ErrorClass`].

mod error;

pub use error::{ApiError, ApiResult, BootstrapError, ErrorClass};

use crate::artifact::{
    adapters::{
        FilesystemArtifactStore,
        memory::{InMemoryArtifactRepository, InMemoryArtifactStore},
    },
    domain::{ArtifactId, ArtifactRecord},
    ports::{ArtifactRepository, ArtifactStore},
    services::{ArtifactService, UploadArtifactRequest},
};
use crate::config::Settings;
use crate::deployment::{
    adapters::{
        HttpInstanceClient,
        container::ContainerCliRuntime,
        memory::{InMemoryDeploymentRegistry, InMemoryInstanceRuntime},
    },
    domain::{ArtifactStatus, DeploymentRecord},
    ports::{DeploymentRegistry, InferenceTransport, InstanceRuntime},
    services::{DeploymentOrchestrator, InferenceProxy, PortAllocator},
};
use mockable::{Clock, DefaultClock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Prediction relayed from an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceResponse {
    /// Artifact that answered.
    pub artifact_id: ArtifactId,
    /// Prediction exactly as the instance reported it.
    pub prediction: Value,
}

/// Upload, list, deploy, infer, and teardown in one place.
pub struct DeploymentApi<A, S, D, R, T, C>
where
    A: ArtifactRepository,
    S: ArtifactStore,
    D: DeploymentRegistry,
    R: InstanceRuntime,
    T: InferenceTransport,
    C: Clock + Send + Sync,
{
    artifacts: ArtifactService<A, S, C>,
    orchestrator: DeploymentOrchestrator<A, S, D, R, C>,
    proxy: InferenceProxy<D, T>,
}

impl<A, S, D, R, T, C> Clone for DeploymentApi<A, S, D, R, T, C>
where
    A: ArtifactRepository,
    S: ArtifactStore,
    D: DeploymentRegistry,
    R: InstanceRuntime,
    T: InferenceTransport,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            artifacts: self.artifacts.clone(),
            orchestrator: self.orchestrator.clone(),
            proxy: self.proxy.clone(),
        }
    }
}

impl<A, S, D, R, T, C> DeploymentApi<A, S, D, R, T, C>
where
    A: ArtifactRepository + 'static,
    S: ArtifactStore + 'static,
    D: DeploymentRegistry + 'static,
    R: InstanceRuntime + 'static,
    T: InferenceTransport,
    C: Clock + Send + Sync + 'static,
{
    /// Assembles the API from its services. The orchestrator and proxy must
    /// share the same registry.
    #[must_use]
    pub const fn new(
        artifacts: ArtifactService<A, S, C>,
        orchestrator: DeploymentOrchestrator<A, S, D, R, C>,
        proxy: InferenceProxy<D, T>,
    ) -> Self {
        Self {
            artifacts,
            orchestrator,
            proxy,
        }
    }

    /// Returns the orchestrator, for reconciliation and inspection.
    #[must_use]
    pub const fn orchestrator(&self) -> &DeploymentOrchestrator<A, S, D, R, C> {
        &self.orchestrator
    }

    /// Stores an uploaded artifact.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorClass::InvalidInput`] error for an empty filename
    /// or payload.
    pub async fn upload(
        &self,
        filename: impl Into<String> + Send,
        contents: impl Into<Vec<u8>> + Send,
    ) -> ApiResult<ArtifactRecord> {
        Ok(self
            .artifacts
            .upload(UploadArtifactRequest::new(filename, contents))
            .await?)
    }

    /// Lists every artifact with its deployment status, reconciling the
    /// registry first.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorClass::ServerError`] error when a backing store
    /// fails.
    pub async fn list(&self) -> ApiResult<Vec<ArtifactStatus>> {
        Ok(self.orchestrator.list().await?)
    }

    /// Deploys an artifact.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorClass::NotFound`] for unknown artifacts,
    /// [`ErrorClass::Conflict`] when already deployed or deploying, and
    /// [`ErrorClass::ServerError`] when bring-up fails.
    pub async fn deploy(&self, artifact_id: &str) -> ApiResult<DeploymentRecord> {
        let id = parse_artifact_id(artifact_id)?;
        Ok(self.orchestrator.deploy(id).await?)
    }

    /// Tears down an artifact's deployment.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorClass::NotFound`] when the artifact is not deployed
    /// and [`ErrorClass::ServerError`] when the runtime fails.
    pub async fn teardown(&self, artifact_id: &str) -> ApiResult<DeploymentRecord> {
        let id = parse_artifact_id(artifact_id)?;
        Ok(self.orchestrator.teardown(id).await?)
    }

    /// Forwards `input` to an artifact's instance.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorClass::InvalidInput`] when `input` is null,
    /// [`ErrorClass::NotFound`] when the artifact is not deployed, and
    /// [`ErrorClass::ServerError`] when the instance fails.
    pub async fn infer(&self, artifact_id: &str, input: &Value) -> ApiResult<InferenceResponse> {
        let id = parse_artifact_id(artifact_id)?;
        if input.is_null() {
            return Err(ApiError::MissingInput);
        }
        let prediction = self.proxy.infer(id, input).await?;
        Ok(InferenceResponse {
            artifact_id: id,
            prediction,
        })
    }

    /// Tears down every running deployment so the process can exit without
    /// leaving instances behind.
    ///
    /// # Errors
    ///
    /// Returns an error only when the registry cannot be read; individual
    /// teardown failures are logged.
    pub async fn shutdown(&self) -> ApiResult<Vec<DeploymentRecord>> {
        let removed = self.orchestrator.teardown_all().await?;
        info!(count = removed.len(), "deployments torn down for shutdown");
        Ok(removed)
    }
}

fn parse_artifact_id(raw: &str) -> ApiResult<ArtifactId> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::InvalidArtifactId(raw.to_owned()))
}

/// API over in-memory adapters and the simulated runtime.
pub type InMemoryDeploymentApi = DeploymentApi<
    InMemoryArtifactRepository,
    InMemoryArtifactStore,
    InMemoryDeploymentRegistry,
    InMemoryInstanceRuntime,
    InMemoryInstanceRuntime,
    DefaultClock,
>;

/// API over on-disk artifacts and a container engine.
pub type ContainerDeploymentApi = DeploymentApi<
    InMemoryArtifactRepository,
    FilesystemArtifactStore,
    InMemoryDeploymentRegistry,
    ContainerCliRuntime,
    HttpInstanceClient,
    DefaultClock,
>;

/// Wires an API around a simulated runtime.
///
/// # Errors
///
/// Returns [`BootstrapError::Config`] when the settings are invalid.
pub fn in_memory_api(
    runtime: Arc<InMemoryInstanceRuntime>,
    settings: &Settings,
) -> Result<InMemoryDeploymentApi, BootstrapError> {
    settings.validate()?;
    let clock = Arc::new(DefaultClock);
    let artifacts = ArtifactService::new(
        Arc::new(InMemoryArtifactRepository::new()),
        Arc::new(InMemoryArtifactStore::new()),
        Arc::clone(&clock),
    );
    let registry = Arc::new(InMemoryDeploymentRegistry::new());
    let ports = Arc::new(PortAllocator::new(settings.port_range()?));
    let orchestrator = DeploymentOrchestrator::new(
        artifacts.clone(),
        Arc::clone(&registry),
        Arc::clone(&runtime),
        ports,
        clock,
        settings.deploy_policy(),
    );
    let proxy = InferenceProxy::new(registry, runtime, settings.inference_timeout());
    Ok(DeploymentApi::new(artifacts, orchestrator, proxy))
}

/// Wires an API that stores artifacts on disk and runs instances in
/// containers.
///
/// # Errors
///
/// Returns [`BootstrapError`] when the settings are invalid or the artifact
/// directory cannot be opened.
pub fn container_api(settings: &Settings) -> Result<ContainerDeploymentApi, BootstrapError> {
    settings.validate()?;
    let artifact_dir = &settings.storage.artifact_dir;
    let store =
        FilesystemArtifactStore::open(artifact_dir).map_err(|source| BootstrapError::Storage {
            path: artifact_dir.clone(),
            source,
        })?;
    let clock = Arc::new(DefaultClock);
    let artifacts = ArtifactService::new(
        Arc::new(InMemoryArtifactRepository::new()),
        Arc::new(store),
        Arc::clone(&clock),
    );
    let registry = Arc::new(InMemoryDeploymentRegistry::new());
    let ports = Arc::new(PortAllocator::new(settings.port_range()?));
    let runtime = Arc::new(ContainerCliRuntime::new(settings.container_runtime()));
    let transport = Arc::new(HttpInstanceClient::new(
        settings.runtime.host.clone(),
        settings.inference_timeout(),
    ));
    let orchestrator = DeploymentOrchestrator::new(
        artifacts.clone(),
        Arc::clone(&registry),
        runtime,
        ports,
        clock,
        settings.deploy_policy(),
    );
    let proxy = InferenceProxy::new(registry, transport, settings.inference_timeout());
    Ok(DeploymentApi::new(artifacts, orchestrator, proxy))
}
