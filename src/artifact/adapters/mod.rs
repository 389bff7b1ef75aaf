//! Adapter implementations for artifact ports.

pub mod memory;

mod filesystem;

pub use filesystem::FilesystemArtifactStore;
