//! Gropius: model deployment orchestration.
//!
//! This crate turns uploaded model artifacts into health-checked, isolated
//! instances with exclusively assigned ports, forwards prediction requests
//! to them, and retires them again.
//!
//! # Architecture
//!
//! Gropius follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (container CLI, HTTP,
//!   in-memory)
//!
//! # Modules
//!
//! - [`artifact`]: Artifact upload, storage, and lookup
//! - [`deployment`]: Deployment state machine, registry, port allocation,
//!   orchestration, and inference proxying
//! - [`api`]: Boundary surface with error classification
//! - [`config`]: TOML and environment configuration
//! - [`telemetry`]: `tracing` subscriber setup

pub mod api;
pub mod artifact;
pub mod config;
pub mod deployment;
pub mod telemetry;
