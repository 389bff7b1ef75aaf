//! Uploaded model artifacts and their storage.
//!
//! Artifacts are opaque computation packages. This module records who
//! uploaded what (`ArtifactRecord`), where the bytes live
//! (`ArtifactLocation`), and hands the bytes back to the deployment
//! orchestrator when an image needs building. The module follows the same
//! hexagonal split as the rest of the crate:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Application services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
