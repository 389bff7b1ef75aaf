//! Instance runtime port wrapping the container runtime.

use crate::artifact::domain::{ArtifactFilename, ArtifactId};
use crate::deployment::domain::{HealthProbe, ImageHandle, InstanceHandle};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for instance runtime operations.
pub type InstanceRuntimeResult<T> = Result<T, InstanceRuntimeError>;

/// Everything the runtime needs to build an image for an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuildRequest {
    /// Artifact being built.
    pub artifact_id: ArtifactId,
    /// Filename supplied at upload.
    pub filename: ArtifactFilename,
    /// Artifact payload, copied into the image unchanged.
    pub contents: Vec<u8>,
}

/// Capability interface over the isolated-instance runtime.
///
/// The artifact's behaviour is opaque here: the runtime packages the bytes
/// into an image and the instance executes them.
#[async_trait]
pub trait InstanceRuntime: Send + Sync {
    /// Builds a runnable image from an artifact payload.
    async fn build(&self, request: &ImageBuildRequest) -> InstanceRuntimeResult<ImageHandle>;

    /// Starts an instance of `image` named and bound as `instance` says.
    async fn start(&self, image: &ImageHandle, instance: &InstanceHandle)
    -> InstanceRuntimeResult<()>;

    /// Probes the instance health endpoint once.
    ///
    /// Reports [`HealthProbe::Exited`] with captured output when the
    /// instance has stopped on its own.
    async fn probe_health(&self, instance: &InstanceHandle) -> InstanceRuntimeResult<HealthProbe>;

    /// Reports whether the instance is still running.
    ///
    /// Unknown instances are reported as not running.
    async fn is_running(&self, instance: &InstanceHandle) -> InstanceRuntimeResult<bool>;

    /// Stops the instance.
    async fn stop(&self, instance: &InstanceHandle) -> InstanceRuntimeResult<()>;

    /// Removes a stopped instance.
    async fn remove(&self, instance: &InstanceHandle) -> InstanceRuntimeResult<()>;
}

/// Errors returned by instance runtime adapters.
#[derive(Debug, Clone, Error)]
pub enum InstanceRuntimeError {
    /// The runtime refused to build the image.
    #[error("image build rejected: {0}")]
    BuildRejected(String),

    /// The runtime refused to start the instance.
    #[error("instance {instance} failed to start: {detail}")]
    StartRejected {
        /// Instance name.
        instance: String,
        /// Runtime output describing the failure.
        detail: String,
    },

    /// The runtime does not know the instance.
    #[error("unknown instance: {0}")]
    UnknownInstance(String),

    /// A runtime command exited unsuccessfully.
    #[error("runtime command `{command}` failed: {detail}")]
    CommandFailed {
        /// Command that failed.
        command: String,
        /// Runtime output describing the failure.
        detail: String,
    },

    /// Generic runtime failure.
    #[error("instance runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl InstanceRuntimeError {
    /// Wraps a runtime error from the adapter.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}
