//! Network transport port for forwarding predictions to instances.

use crate::deployment::domain::InstanceHandle;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Result type for inference transport operations.
pub type InferenceTransportResult<T> = Result<T, InferenceTransportError>;

/// Sends a prediction request to an instance and returns its answer.
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    /// Forwards `input` to the instance prediction endpoint and returns the
    /// prediction value exactly as the instance reported it.
    async fn predict(
        &self,
        instance: &InstanceHandle,
        input: &Value,
    ) -> InferenceTransportResult<Value>;
}

/// Errors returned by inference transport adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceTransportError {
    /// The instance could not be reached.
    #[error("instance unreachable: {0}")]
    Unreachable(String),

    /// The request did not complete within the configured timeout.
    #[error("instance did not answer within the request timeout")]
    TimedOut,

    /// The instance answered with a non-success status.
    #[error("instance answered with status {status}{}", detail_suffix(.detail.as_deref()))]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Detail reported by the instance, if any.
        detail: Option<String>,
    },

    /// The instance answered successfully but the body was unusable.
    #[error("malformed instance response: {0}")]
    MalformedResponse(String),
}

impl InferenceTransportError {
    /// Returns the most specific detail available for reporting upstream.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Rejected {
                detail: Some(detail),
                ..
            } => detail.clone(),
            other => other.to_string(),
        }
    }
}

fn detail_suffix(detail: Option<&str>) -> String {
    detail.map_or_else(String::new, |text| format!(": {text}"))
}
