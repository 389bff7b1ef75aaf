//! Application services for deploying artifacts and serving predictions.

mod health_check;
mod orchestrator;
mod port_allocator;
mod proxy;

pub use health_check::{HealthCheckOutcome, HealthCheckPolicy, await_healthy};
pub use orchestrator::{
    DEFAULT_INSTANCE_PREFIX, DeployPolicy, DeploymentOrchestrator, DeploymentServiceError,
    DeploymentServiceResult, ReconciliationReport,
};
pub use port_allocator::{PortAllocator, PortAllocatorError};
pub use proxy::{InferenceProxy, InferenceProxyError, InferenceProxyResult};
