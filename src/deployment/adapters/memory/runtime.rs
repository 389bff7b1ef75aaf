//! Deterministic in-process instance runtime.
//!
//! Instances are simulated entries in a map. Each artifact can be scripted
//! to fail or stall at a given lifecycle step, so orchestration paths can be
//! exercised without a container engine.

use crate::artifact::domain::ArtifactId;
use crate::deployment::{
    domain::{HealthProbe, ImageHandle, InstanceHandle},
    ports::{
        ImageBuildRequest, InferenceTransport, InferenceTransportError, InferenceTransportResult,
        InstanceRuntime, InstanceRuntimeError, InstanceRuntimeResult,
    },
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Opaque model callable executed by simulated instances.
pub type ModelFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

#[derive(Clone, Default)]
struct ArtifactScript {
    fail_build: Option<String>,
    hang_build: bool,
    fail_start: Option<String>,
    hang_start: bool,
    exit_after_start: Option<String>,
    unhealthy_probes: u32,
    never_healthy: bool,
    fail_stop: Option<String>,
    model: Option<ModelFn>,
}

#[derive(Debug, Clone)]
struct SimulatedInstance {
    artifact_id: ArtifactId,
    handle: InstanceHandle,
    running: bool,
    probes: u32,
    exit_logs: Option<String>,
}

#[derive(Default)]
struct RuntimeState {
    scripts: HashMap<ArtifactId, ArtifactScript>,
    images: HashMap<ImageHandle, ArtifactId>,
    instances: HashMap<String, SimulatedInstance>,
}

impl RuntimeState {
    fn script(&self, artifact_id: ArtifactId) -> ArtifactScript {
        self.scripts.get(&artifact_id).cloned().unwrap_or_default()
    }

    fn port_taken(&self, instance: &InstanceHandle) -> bool {
        self.instances.values().any(|existing| {
            existing.running
                && existing.handle.port() == instance.port()
                && existing.handle.name() != instance.name()
        })
    }
}

/// In-process runtime that simulates instances and answers predictions by
/// invoking a registered model callable.
///
/// Artifacts without a registered model echo their input back.
#[derive(Clone, Default)]
pub struct InMemoryInstanceRuntime {
    state: Arc<RwLock<RuntimeState>>,
}

impl fmt::Debug for InMemoryInstanceRuntime {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        formatter
            .debug_struct("InMemoryInstanceRuntime")
            .field("scripted_artifacts", &state.scripts.len())
            .field("images", &state.images.len())
            .field("instances", &state.instances.len())
            .finish()
    }
}

impl InMemoryInstanceRuntime {
    /// Creates a runtime with no scripted behaviour.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RuntimeState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RuntimeState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn script_mut<F>(&self, artifact_id: ArtifactId, update: F)
    where
        F: FnOnce(&mut ArtifactScript),
    {
        let mut state = self.write();
        update(state.scripts.entry(artifact_id).or_default());
    }

    /// Registers the model callable instances of `artifact_id` execute.
    pub fn install_model<F>(&self, artifact_id: ArtifactId, model: F)
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.script_mut(artifact_id, |script| script.model = Some(Arc::new(model)));
    }

    /// Makes image builds for `artifact_id` fail with `reason`.
    pub fn fail_build(&self, artifact_id: ArtifactId, reason: impl Into<String>) {
        let text = reason.into();
        self.script_mut(artifact_id, |script| script.fail_build = Some(text));
    }

    /// Makes image builds for `artifact_id` never complete.
    pub fn hang_build(&self, artifact_id: ArtifactId) {
        self.script_mut(artifact_id, |script| script.hang_build = true);
    }

    /// Makes instance starts for `artifact_id` fail with `reason`.
    pub fn fail_start(&self, artifact_id: ArtifactId, reason: impl Into<String>) {
        let text = reason.into();
        self.script_mut(artifact_id, |script| script.fail_start = Some(text));
    }

    /// Makes instance starts for `artifact_id` create the instance and then
    /// never return.
    pub fn hang_start(&self, artifact_id: ArtifactId) {
        self.script_mut(artifact_id, |script| script.hang_start = true);
    }

    /// Clears any scripted start failure or stall for `artifact_id`.
    pub fn allow_start(&self, artifact_id: ArtifactId) {
        self.script_mut(artifact_id, |script| {
            script.fail_start = None;
            script.hang_start = false;
        });
    }

    /// Makes instances of `artifact_id` exit right after starting, leaving
    /// `logs` behind.
    pub fn exit_after_start(&self, artifact_id: ArtifactId, logs: impl Into<String>) {
        let text = logs.into();
        self.script_mut(artifact_id, |script| script.exit_after_start = Some(text));
    }

    /// Makes the first `probes` health probes of each instance fail.
    pub fn healthy_after(&self, artifact_id: ArtifactId, probes: u32) {
        self.script_mut(artifact_id, |script| script.unhealthy_probes = probes);
    }

    /// Makes instances of `artifact_id` run but never answer health probes.
    pub fn never_healthy(&self, artifact_id: ArtifactId) {
        self.script_mut(artifact_id, |script| script.never_healthy = true);
    }

    /// Makes stopping instances of `artifact_id` fail with `reason`.
    pub fn fail_stop(&self, artifact_id: ArtifactId, reason: impl Into<String>) {
        let text = reason.into();
        self.script_mut(artifact_id, |script| script.fail_stop = Some(text));
    }

    /// Clears any scripted stop failure for `artifact_id`.
    pub fn allow_stop(&self, artifact_id: ArtifactId) {
        self.script_mut(artifact_id, |script| script.fail_stop = None);
    }

    /// Simulates every instance of `artifact_id` dying out of band.
    ///
    /// Returns how many running instances were affected.
    #[must_use]
    pub fn crash(&self, artifact_id: ArtifactId) -> usize {
        let mut state = self.write();
        let mut crashed = 0;
        for instance in state
            .instances
            .values_mut()
            .filter(|instance| instance.artifact_id == artifact_id && instance.running)
        {
            instance.running = false;
            crashed += 1;
        }
        crashed
    }

    /// Returns how many instances exist, running or not.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.read().instances.len()
    }

    /// Returns how many instances are running.
    #[must_use]
    pub fn live_instance_count(&self) -> usize {
        self.read()
            .instances
            .values()
            .filter(|instance| instance.running)
            .count()
    }

    /// Returns the handle of an existing instance of `artifact_id`.
    #[must_use]
    pub fn instance_for(&self, artifact_id: ArtifactId) -> Option<InstanceHandle> {
        self.read()
            .instances
            .values()
            .find(|instance| instance.artifact_id == artifact_id)
            .map(|instance| instance.handle.clone())
    }

    /// Returns how many images have been built.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.read().images.len()
    }
}

#[async_trait]
impl InstanceRuntime for InMemoryInstanceRuntime {
    async fn build(&self, request: &ImageBuildRequest) -> InstanceRuntimeResult<ImageHandle> {
        let script = self.read().script(request.artifact_id);
        if let Some(reason) = script.fail_build {
            return Err(InstanceRuntimeError::BuildRejected(reason));
        }
        if script.hang_build {
            return std::future::pending().await;
        }

        let image = ImageHandle::new(format!("memory-image-{}", request.artifact_id))
            .map_err(InstanceRuntimeError::runtime)?;
        self.write()
            .images
            .insert(image.clone(), request.artifact_id);
        Ok(image)
    }

    async fn start(
        &self,
        image: &ImageHandle,
        instance: &InstanceHandle,
    ) -> InstanceRuntimeResult<()> {
        let script = {
            let mut state = self.write();
            let Some(artifact_id) = state.images.get(image).copied() else {
                return Err(InstanceRuntimeError::StartRejected {
                    instance: instance.name().to_owned(),
                    detail: format!("no such image: {image}"),
                });
            };
            let scripted = state.script(artifact_id);
            if let Some(reason) = scripted.fail_start.clone() {
                return Err(InstanceRuntimeError::StartRejected {
                    instance: instance.name().to_owned(),
                    detail: reason,
                });
            }
            if state.instances.contains_key(instance.name()) {
                return Err(InstanceRuntimeError::StartRejected {
                    instance: instance.name().to_owned(),
                    detail: "an instance with this name already exists".to_owned(),
                });
            }
            if state.port_taken(instance) {
                return Err(InstanceRuntimeError::StartRejected {
                    instance: instance.name().to_owned(),
                    detail: format!("port {} is already bound", instance.port()),
                });
            }
            state.instances.insert(
                instance.name().to_owned(),
                SimulatedInstance {
                    artifact_id,
                    handle: instance.clone(),
                    running: scripted.exit_after_start.is_none(),
                    probes: 0,
                    exit_logs: scripted.exit_after_start.clone(),
                },
            );
            scripted
        };

        if script.hang_start {
            return std::future::pending().await;
        }
        Ok(())
    }

    async fn probe_health(&self, instance: &InstanceHandle) -> InstanceRuntimeResult<HealthProbe> {
        let mut state = self.write();
        let Some(simulated) = state.instances.get_mut(instance.name()) else {
            return Err(InstanceRuntimeError::UnknownInstance(
                instance.name().to_owned(),
            ));
        };
        if !simulated.running {
            return Ok(HealthProbe::exited(
                simulated.exit_logs.clone().unwrap_or_default(),
            ));
        }
        let artifact_id = simulated.artifact_id;
        simulated.probes = simulated.probes.saturating_add(1);
        let probes = simulated.probes;
        let script = state.script(artifact_id);
        if script.never_healthy || probes <= script.unhealthy_probes {
            return Ok(HealthProbe::unreachable("connection refused"));
        }
        Ok(HealthProbe::Healthy)
    }

    async fn is_running(&self, instance: &InstanceHandle) -> InstanceRuntimeResult<bool> {
        Ok(self
            .read()
            .instances
            .get(instance.name())
            .is_some_and(|simulated| simulated.running))
    }

    async fn stop(&self, instance: &InstanceHandle) -> InstanceRuntimeResult<()> {
        let mut state = self.write();
        let Some(artifact_id) = state
            .instances
            .get(instance.name())
            .map(|simulated| simulated.artifact_id)
        else {
            return Err(InstanceRuntimeError::UnknownInstance(
                instance.name().to_owned(),
            ));
        };
        if let Some(reason) = state.script(artifact_id).fail_stop {
            return Err(InstanceRuntimeError::CommandFailed {
                command: format!("stop {}", instance.name()),
                detail: reason,
            });
        }
        if let Some(simulated) = state.instances.get_mut(instance.name()) {
            simulated.running = false;
        }
        Ok(())
    }

    async fn remove(&self, instance: &InstanceHandle) -> InstanceRuntimeResult<()> {
        let mut state = self.write();
        match state.instances.get(instance.name()) {
            None => Err(InstanceRuntimeError::UnknownInstance(
                instance.name().to_owned(),
            )),
            Some(simulated) if simulated.running => Err(InstanceRuntimeError::CommandFailed {
                command: format!("rm {}", instance.name()),
                detail: "instance is still running".to_owned(),
            }),
            Some(_) => {
                state.instances.remove(instance.name());
                Ok(())
            }
        }
    }
}

#[async_trait]
impl InferenceTransport for InMemoryInstanceRuntime {
    async fn predict(
        &self,
        instance: &InstanceHandle,
        input: &Value,
    ) -> InferenceTransportResult<Value> {
        let model = {
            let state = self.read();
            let Some(simulated) = state
                .instances
                .get(instance.name())
                .filter(|simulated| simulated.running)
            else {
                return Err(InferenceTransportError::Unreachable(format!(
                    "no running instance at {instance}"
                )));
            };
            state.script(simulated.artifact_id).model
        };

        match model {
            None => Ok(input.clone()),
            Some(callable) => {
                callable(input).map_err(|detail| InferenceTransportError::Rejected {
                    status: 500,
                    detail: Some(detail),
                })
            }
        }
    }
}
