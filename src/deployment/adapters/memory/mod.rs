//! In-memory deployment adapters.
//!
//! The registry is the production registry: deployment state lives only for
//! the lifetime of the process. The runtime simulates instances and is
//! intended for tests and local development.

mod registry;
mod runtime;

pub use registry::InMemoryDeploymentRegistry;
pub use runtime::{InMemoryInstanceRuntime, ModelFn};
