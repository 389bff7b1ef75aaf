//! Port contracts for deployment orchestration.

mod registry;
mod runtime;
mod transport;

pub use registry::{DeploymentRegistry, DeploymentRegistryError, DeploymentRegistryResult};
pub use runtime::{
    ImageBuildRequest, InstanceRuntime, InstanceRuntimeError, InstanceRuntimeResult,
};
pub use transport::{InferenceTransport, InferenceTransportError, InferenceTransportResult};
