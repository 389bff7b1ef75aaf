//! Error types for deployment domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing or mutating deployment domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeploymentDomainError {
    /// Transitioning between two deployment states is invalid.
    #[error("invalid deployment state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// Current deployment state.
        from: String,
        /// Requested target state.
        to: String,
    },

    /// A port range must contain at least one port.
    #[error("port range must contain at least one port")]
    EmptyPortRange,

    /// The port range runs past the highest TCP port.
    #[error("port range starting at {base} with {capacity} ports exceeds 65535")]
    PortRangeOverflow {
        /// First port of the range.
        base: u16,
        /// Number of ports requested.
        capacity: u16,
    },

    /// Port zero is reserved and cannot be assigned to an instance.
    #[error("port 0 cannot be assigned to an instance")]
    ZeroPort,

    /// An image handle is empty after trimming.
    #[error("image handle must not be empty")]
    EmptyImageHandle,

    /// An instance name is empty after trimming.
    #[error("instance name must not be empty")]
    EmptyInstanceName,
}

/// Error returned while parsing a deployment state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown deployment state: {0}")]
pub struct ParseDeploymentStateError(pub String);
