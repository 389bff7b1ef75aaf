//! Deployment orchestration, registry, and inference proxying.
//!
//! A deployment promotes an uploaded artifact to a running, health-checked
//! instance with an exclusively assigned port. This module holds the
//! deployment state machine, the registry that tracks live instances, the
//! port allocator, and the proxy that forwards prediction requests.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
