//! Boundary error type and its classification.

use crate::artifact::services::ArtifactServiceError;
use crate::config::ConfigError;
use crate::deployment::services::{DeploymentServiceError, InferenceProxyError};
use camino::Utf8PathBuf;
use thiserror::Error;

/// Coarse error category a transport layer maps to a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The artifact or deployment does not exist.
    NotFound,
    /// The request conflicts with an existing or in-flight deployment.
    Conflict,
    /// The request itself is malformed.
    InvalidInput,
    /// The service or an instance failed.
    ServerError,
}

impl ErrorClass {
    /// Returns the HTTP status code conventionally used for this class.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::InvalidInput => 400,
            Self::ServerError => 500,
        }
    }
}

/// Errors surfaced by [`super::DeploymentApi`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// The artifact identifier does not parse; no such artifact can exist.
    #[error("artifact {0} not found")]
    InvalidArtifactId(String),

    /// An inference request carried no input.
    #[error("inference input is required")]
    MissingInput,

    /// Upload or lookup failed.
    #[error(transparent)]
    Artifact(#[from] ArtifactServiceError),

    /// Deploy, teardown, or listing failed.
    #[error(transparent)]
    Deployment(#[from] DeploymentServiceError),

    /// Inference failed.
    #[error(transparent)]
    Inference(#[from] InferenceProxyError),
}

/// Result type for boundary operations.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Classifies the error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidArtifactId(_) => ErrorClass::NotFound,
            Self::MissingInput => ErrorClass::InvalidInput,
            Self::Artifact(err) => artifact_class(err),
            Self::Deployment(err) => match err {
                DeploymentServiceError::NotFound(_) | DeploymentServiceError::NotDeployed(_) => {
                    ErrorClass::NotFound
                }
                DeploymentServiceError::Conflict { .. } => ErrorClass::Conflict,
                DeploymentServiceError::Artifact(inner) => artifact_class(inner),
                _ => ErrorClass::ServerError,
            },
            Self::Inference(err) => match err {
                InferenceProxyError::NotDeployed(_) => ErrorClass::NotFound,
                InferenceProxyError::Upstream { .. } | InferenceProxyError::Registry(_) => {
                    ErrorClass::ServerError
                }
            },
        }
    }
}

const fn artifact_class(err: &ArtifactServiceError) -> ErrorClass {
    match err {
        ArtifactServiceError::Domain(_) => ErrorClass::InvalidInput,
        ArtifactServiceError::NotFound(_) => ErrorClass::NotFound,
        ArtifactServiceError::Repository(_) | ArtifactServiceError::Store(_) => {
            ErrorClass::ServerError
        }
    }
}

/// Errors raised while wiring a [`super::DeploymentApi`] from settings.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Settings are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The artifact directory could not be opened.
    #[error("failed to open artifact directory {path}: {source}")]
    Storage {
        /// Artifact directory.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}
