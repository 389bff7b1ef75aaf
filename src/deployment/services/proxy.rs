//! Forwarding of prediction requests to live instances.

use crate::artifact::domain::ArtifactId;
use crate::deployment::ports::{
    DeploymentRegistry, DeploymentRegistryError, InferenceTransport, InferenceTransportError,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors returned by the inference proxy.
#[derive(Debug, Error)]
pub enum InferenceProxyError {
    /// The artifact has no running deployment.
    #[error("artifact {0} is not deployed")]
    NotDeployed(ArtifactId),

    /// The instance could not answer the request.
    #[error("inference for artifact {artifact_id} failed: {detail}")]
    Upstream {
        /// Artifact identifier.
        artifact_id: ArtifactId,
        /// Detail reported by the instance, or the transport failure.
        detail: String,
        /// Transport failure.
        #[source]
        source: InferenceTransportError,
    },

    /// Registry lookup failed.
    #[error(transparent)]
    Registry(#[from] DeploymentRegistryError),
}

/// Result type for inference proxy operations.
pub type InferenceProxyResult<T> = Result<T, InferenceProxyError>;

/// Looks up the live deployment for an artifact and forwards input to it.
pub struct InferenceProxy<D, T>
where
    D: DeploymentRegistry,
    T: InferenceTransport,
{
    registry: Arc<D>,
    transport: Arc<T>,
    request_timeout: Duration,
}

impl<D, T> Clone for InferenceProxy<D, T>
where
    D: DeploymentRegistry,
    T: InferenceTransport,
{
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            transport: Arc::clone(&self.transport),
            request_timeout: self.request_timeout,
        }
    }
}

impl<D, T> InferenceProxy<D, T>
where
    D: DeploymentRegistry,
    T: InferenceTransport,
{
    /// Creates a proxy bounding each forwarded request by `request_timeout`.
    #[must_use]
    pub const fn new(registry: Arc<D>, transport: Arc<T>, request_timeout: Duration) -> Self {
        Self {
            registry,
            transport,
            request_timeout,
        }
    }

    /// Forwards `input` to the artifact's instance and returns its
    /// prediction unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceProxyError::NotDeployed`] when no running
    /// deployment exists, or [`InferenceProxyError::Upstream`] when the
    /// instance is unreachable, too slow, or reports a failure.
    pub async fn infer(&self, artifact_id: ArtifactId, input: &Value) -> InferenceProxyResult<Value> {
        let record = self
            .registry
            .get(artifact_id)
            .await?
            .ok_or(InferenceProxyError::NotDeployed(artifact_id))?;
        debug!(artifact_id = %artifact_id, port = record.port().get(), "forwarding inference");

        let forwarded = tokio::time::timeout(
            self.request_timeout,
            self.transport.predict(record.instance(), input),
        )
        .await
        .unwrap_or(Err(InferenceTransportError::TimedOut));

        forwarded.map_err(|source| {
            warn!(artifact_id = %artifact_id, error = %source, "inference failed");
            InferenceProxyError::Upstream {
                artifact_id,
                detail: source.detail(),
                source,
            }
        })
    }
}
