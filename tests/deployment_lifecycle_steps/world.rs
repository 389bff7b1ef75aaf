//! Shared world state for deployment lifecycle BDD scenarios.

use std::sync::Arc;

use gropius::api::{ApiResult, InMemoryDeploymentApi, InferenceResponse, in_memory_api};
use gropius::config::Settings;
use gropius::deployment::{adapters::memory::InMemoryInstanceRuntime, domain::DeploymentRecord};
use rstest::fixture;

/// Scenario world for deployment lifecycle behaviour tests.
pub struct DeploymentWorld {
    pub api: InMemoryDeploymentApi,
    pub runtime: Arc<InMemoryInstanceRuntime>,
    pub artifact_id: Option<String>,
    pub last_deploy: Option<ApiResult<DeploymentRecord>>,
    pub last_inference: Option<ApiResult<InferenceResponse>>,
}

impl DeploymentWorld {
    /// Creates a world over the simulated runtime with short health-check
    /// bounds.
    #[must_use]
    pub fn new() -> Self {
        let mut settings = Settings::default();
        settings.health_check.max_attempts = 3;
        settings.health_check.interval_ms = 10;
        settings.deploy.timeout_ms = 5_000;
        let runtime = Arc::new(InMemoryInstanceRuntime::new());
        let api = in_memory_api(Arc::clone(&runtime), &settings)
            .expect("default settings with short bounds are valid");

        Self {
            api,
            runtime,
            artifact_id: None,
            last_deploy: None,
            last_inference: None,
        }
    }

    /// Returns the identifier of the artifact uploaded by the scenario.
    ///
    /// # Errors
    ///
    /// Returns an error when no artifact was uploaded yet.
    pub fn artifact_id(&self) -> Result<String, eyre::Report> {
        self.artifact_id
            .clone()
            .ok_or_else(|| eyre::eyre!("missing uploaded artifact in scenario world"))
    }
}

impl Default for DeploymentWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> DeploymentWorld {
    DeploymentWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
