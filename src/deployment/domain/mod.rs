//! Domain model for deployments.
//!
//! Covers the deployment state machine, the live deployment record, port
//! values, instance and image handles, and health probe outcomes.
//! Infrastructure concerns remain outside this boundary.

mod error;
mod handles;
mod health;
mod port;
mod record;
mod state;
mod status;

pub use error::{DeploymentDomainError, ParseDeploymentStateError};
pub use handles::{ImageHandle, InstanceHandle};
pub use health::HealthProbe;
pub use port::{PortRange, ServicePort};
pub use record::DeploymentRecord;
pub use state::DeploymentState;
pub use status::ArtifactStatus;
