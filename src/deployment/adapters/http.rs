//! HTTP client for the instance health and prediction endpoints.
//!
//! Instances answer `GET /health` with `{"status": "ok"}` and
//! `POST /predict` with `{"prediction": ..}`. Failures carry a JSON body of
//! the form `{"detail": ..}`.

use crate::deployment::{
    domain::{HealthProbe, InstanceHandle},
    ports::{InferenceTransport, InferenceTransportError, InferenceTransportResult},
};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    input: &'a Value,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    prediction: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Value,
}

/// `reqwest`-backed client for talking to instances bound on a host.
#[derive(Debug, Clone)]
pub struct HttpInstanceClient {
    http: HttpClient,
    host: String,
    request_timeout: Duration,
}

impl HttpInstanceClient {
    /// Creates a client addressing instances on `host` with the given
    /// prediction timeout.
    #[must_use]
    pub fn new(host: impl Into<String>, request_timeout: Duration) -> Self {
        let http = HttpClient::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "failed to build HTTP client, using defaults");
                HttpClient::new()
            });
        Self {
            http,
            host: host.into(),
            request_timeout,
        }
    }

    /// Returns the base URL of an instance.
    #[must_use]
    pub fn base_url(&self, instance: &InstanceHandle) -> String {
        format!("http://{}:{}", self.host, instance.port())
    }

    /// Issues one `GET /health` against the instance.
    ///
    /// Any transport failure or non-success answer is reported as
    /// [`HealthProbe::Unreachable`]; this client cannot tell whether the
    /// instance process has exited.
    pub async fn check_health(&self, instance: &InstanceHandle, timeout: Duration) -> HealthProbe {
        let url = format!("{}/health", self.base_url(instance));
        match self.http.get(&url).timeout(timeout).send().await {
            Ok(response) if response.status().is_success() => HealthProbe::Healthy,
            Ok(response) => {
                HealthProbe::unreachable(format!("health endpoint answered {}", response.status()))
            }
            Err(err) => {
                debug!(instance = %instance, error = %err, "health probe failed");
                HealthProbe::unreachable(err.to_string())
            }
        }
    }
}

fn classify(err: &reqwest::Error) -> InferenceTransportError {
    if err.is_timeout() {
        InferenceTransportError::TimedOut
    } else {
        InferenceTransportError::Unreachable(err.to_string())
    }
}

fn detail_text(detail: Value) -> String {
    match detail {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[async_trait]
impl InferenceTransport for HttpInstanceClient {
    async fn predict(
        &self,
        instance: &InstanceHandle,
        input: &Value,
    ) -> InferenceTransportResult<Value> {
        let url = format!("{}/predict", self.base_url(instance));
        let response = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(&PredictRequest { input })
            .send()
            .await
            .map_err(|err| classify(&err))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| classify(&err))?;
        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .map(|parsed| detail_text(parsed.detail));
            return Err(InferenceTransportError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_slice::<PredictResponse>(&body)
            .map(|parsed| parsed.prediction)
            .map_err(|err| InferenceTransportError::MalformedResponse(err.to_string()))
    }
}
