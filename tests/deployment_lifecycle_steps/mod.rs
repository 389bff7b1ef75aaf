//! Step definitions for deployment lifecycle scenarios.

mod given;
mod then;
mod when;
pub mod world;
