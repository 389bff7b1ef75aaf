//! Adapter implementations for deployment ports.

pub mod container;
pub mod memory;

mod http;

pub use http::HttpInstanceClient;
