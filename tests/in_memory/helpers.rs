//! Shared test helpers for in-memory deployment integration tests.

use gropius::api::{InMemoryDeploymentApi, in_memory_api};
use gropius::artifact::domain::ArtifactId;
use gropius::config::Settings;
use gropius::deployment::adapters::memory::InMemoryInstanceRuntime;
use rstest::fixture;
use std::sync::Arc;

/// API plus the simulated runtime behind it.
pub struct TestApi {
    pub api: InMemoryDeploymentApi,
    pub runtime: Arc<InMemoryInstanceRuntime>,
}

impl TestApi {
    /// Uploads `filename` with a fixed payload and returns its identifier as
    /// a string, the form the API accepts.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected.
    pub async fn upload(&self, filename: &str) -> Result<String, eyre::Report> {
        let record = self
            .api
            .upload(filename, b"serialized-model".to_vec())
            .await?;
        Ok(record.id().to_string())
    }
}

/// Settings with short health-check and deploy bounds.
#[must_use]
pub fn fast_settings(capacity: u16) -> Settings {
    let mut settings = Settings::default();
    settings.ports.capacity = capacity;
    settings.health_check.max_attempts = 3;
    settings.health_check.interval_ms = 10;
    settings.health_check.probe_timeout_ms = 50;
    settings.deploy.timeout_ms = 5_000;
    settings.inference.timeout_ms = 1_000;
    settings
}

/// Builds an API with room for `capacity` concurrent deployments.
///
/// # Errors
///
/// Returns an error if the settings are rejected.
pub fn build_api(capacity: u16) -> Result<TestApi, eyre::Report> {
    let runtime = Arc::new(InMemoryInstanceRuntime::new());
    let api = in_memory_api(Arc::clone(&runtime), &fast_settings(capacity))?;
    Ok(TestApi { api, runtime })
}

/// Provides an API with room for eight deployments.
///
/// # Errors
///
/// Returns an error if the API cannot be assembled.
#[fixture]
pub fn test_api() -> Result<TestApi, eyre::Report> {
    build_api(8)
}

/// Parses an identifier returned by [`TestApi::upload`].
///
/// # Errors
///
/// Returns an error if `raw` is not an artifact identifier.
pub fn artifact_id(raw: &str) -> Result<ArtifactId, eyre::Report> {
    raw.parse()
        .map_err(|err| eyre::eyre!("invalid artifact id {raw}: {err}"))
}
