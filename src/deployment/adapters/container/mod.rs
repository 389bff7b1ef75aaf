//! Container engine runtime driven through the `docker` (or `podman`) CLI.
//!
//! Each artifact becomes an image tagged `<prefix>-<artifact>:latest` and
//! each deployment a detached container publishing its server port on the
//! host port the orchestrator assigned.

mod dockerfile;

pub use dockerfile::{
    ARTIFACT_FILE_NAME, BuildContextError, DockerfileSpec, render_dockerfile, write_build_context,
};

use crate::deployment::{
    adapters::HttpInstanceClient,
    domain::{HealthProbe, ImageHandle, InstanceHandle},
    ports::{ImageBuildRequest, InstanceRuntime, InstanceRuntimeError, InstanceRuntimeResult},
};
use async_trait::async_trait;
use camino::Utf8PathBuf;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Settings for [`ContainerCliRuntime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRuntimeConfig {
    /// Container CLI binary, such as `docker` or `podman`.
    pub binary: String,
    /// Host interface instances publish their ports on.
    pub host: String,
    /// Port the instance server listens on inside the container.
    pub container_port: u16,
    /// Base image providing the serving runtime.
    pub base_image: String,
    /// Server command run inside the container.
    pub serve_command: Vec<String>,
    /// Directory holding per-artifact build contexts.
    pub build_root: Utf8PathBuf,
    /// Prefix for image tags.
    pub image_prefix: String,
    /// Timeout for a single health probe.
    pub probe_timeout: Duration,
}

/// [`InstanceRuntime`] backed by a container engine CLI.
#[derive(Debug, Clone)]
pub struct ContainerCliRuntime {
    config: ContainerRuntimeConfig,
    probe_client: HttpInstanceClient,
}

impl ContainerCliRuntime {
    /// Creates a runtime using `config`.
    #[must_use]
    pub fn new(config: ContainerRuntimeConfig) -> Self {
        let probe_client = HttpInstanceClient::new(config.host.clone(), config.probe_timeout);
        Self {
            config,
            probe_client,
        }
    }

    /// Returns the runtime configuration.
    #[must_use]
    pub const fn config(&self) -> &ContainerRuntimeConfig {
        &self.config
    }

    async fn run(&self, args: &[String]) -> InstanceRuntimeResult<Output> {
        debug!(binary = %self.config.binary, args = ?args, "running container command");
        Command::new(&self.config.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(InstanceRuntimeError::runtime)
    }

    async fn run_checked(&self, args: &[String]) -> InstanceRuntimeResult<String> {
        let command = args.join(" ");
        let output = self.run(args).await?;
        if !output.status.success() {
            return Err(InstanceRuntimeError::CommandFailed {
                command,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }

    async fn inspect_running(&self, instance: &InstanceHandle) -> InstanceRuntimeResult<bool> {
        let output = self.run(&inspect_args(instance)).await?;
        if !output.status.success() {
            return Ok(false);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim() == "true")
    }

    async fn captured_logs(&self, instance: &InstanceHandle) -> String {
        match self.run(&logs_args(instance)).await {
            Ok(output) => {
                let mut logs = String::from_utf8_lossy(&output.stdout).into_owned();
                logs.push_str(&String::from_utf8_lossy(&output.stderr));
                logs
            }
            Err(err) => format!("failed to collect logs: {err}"),
        }
    }
}

/// Returns the image tag for an artifact.
#[must_use]
pub fn image_tag(prefix: &str, request: &ImageBuildRequest) -> String {
    format!("{prefix}-{}:latest", request.artifact_id)
}

/// Returns `build` arguments for tagging `context_dir` as `tag`.
#[must_use]
pub fn build_args(tag: &str, context_dir: &str) -> Vec<String> {
    vec![
        "build".to_owned(),
        "-t".to_owned(),
        tag.to_owned(),
        context_dir.to_owned(),
    ]
}

/// Returns `run` arguments for a detached instance.
#[must_use]
pub fn run_args(
    image: &ImageHandle,
    instance: &InstanceHandle,
    host: &str,
    container_port: u16,
) -> Vec<String> {
    vec![
        "run".to_owned(),
        "-d".to_owned(),
        "--name".to_owned(),
        instance.name().to_owned(),
        "-p".to_owned(),
        format!("{host}:{}:{container_port}", instance.port()),
        image.as_str().to_owned(),
    ]
}

/// Returns `inspect` arguments reporting whether the instance is running.
#[must_use]
pub fn inspect_args(instance: &InstanceHandle) -> Vec<String> {
    vec![
        "inspect".to_owned(),
        "-f".to_owned(),
        "{{.State.Running}}".to_owned(),
        instance.name().to_owned(),
    ]
}

fn logs_args(instance: &InstanceHandle) -> Vec<String> {
    vec!["logs".to_owned(), instance.name().to_owned()]
}

#[async_trait]
impl InstanceRuntime for ContainerCliRuntime {
    async fn build(&self, request: &ImageBuildRequest) -> InstanceRuntimeResult<ImageHandle> {
        let dockerfile = render_dockerfile(&DockerfileSpec {
            base_image: &self.config.base_image,
            container_port: self.config.container_port,
            serve_command: &self.config.serve_command,
        })
        .map_err(InstanceRuntimeError::runtime)?;

        let root = self.config.build_root.clone();
        let context_name = request.artifact_id.to_string();
        let payload = request.contents.clone();
        let context_dir = tokio::task::spawn_blocking(move || {
            write_build_context(&root, &context_name, &dockerfile, &payload)
        })
        .await
        .map_err(InstanceRuntimeError::runtime)?
        .map_err(InstanceRuntimeError::runtime)?;

        let tag = image_tag(&self.config.image_prefix, request);
        self.run_checked(&build_args(&tag, context_dir.as_str()))
            .await
            .map_err(|err| match err {
                InstanceRuntimeError::CommandFailed { detail, .. } => {
                    InstanceRuntimeError::BuildRejected(detail)
                }
                other => other,
            })?;

        info!(artifact_id = %request.artifact_id, image = %tag, "image built");
        ImageHandle::new(tag).map_err(InstanceRuntimeError::runtime)
    }

    async fn start(
        &self,
        image: &ImageHandle,
        instance: &InstanceHandle,
    ) -> InstanceRuntimeResult<()> {
        let args = run_args(image, instance, &self.config.host, self.config.container_port);
        self.run_checked(&args).await.map_err(|err| match err {
            InstanceRuntimeError::CommandFailed { detail, .. } => {
                InstanceRuntimeError::StartRejected {
                    instance: instance.name().to_owned(),
                    detail,
                }
            }
            other => other,
        })?;
        Ok(())
    }

    async fn probe_health(&self, instance: &InstanceHandle) -> InstanceRuntimeResult<HealthProbe> {
        if !self.inspect_running(instance).await? {
            return Ok(HealthProbe::exited(self.captured_logs(instance).await));
        }
        Ok(self
            .probe_client
            .check_health(instance, self.config.probe_timeout)
            .await)
    }

    async fn is_running(&self, instance: &InstanceHandle) -> InstanceRuntimeResult<bool> {
        self.inspect_running(instance).await
    }

    async fn stop(&self, instance: &InstanceHandle) -> InstanceRuntimeResult<()> {
        self.run_checked(&["stop".to_owned(), instance.name().to_owned()])
            .await
            .map_err(|err| missing_as_unknown(err, instance))?;
        Ok(())
    }

    async fn remove(&self, instance: &InstanceHandle) -> InstanceRuntimeResult<()> {
        self.run_checked(&["rm".to_owned(), instance.name().to_owned()])
            .await
            .map_err(|err| missing_as_unknown(err, instance))?;
        Ok(())
    }
}

/// Reports a command that failed because the engine has no container by
/// the instance's name as [`InstanceRuntimeError::UnknownInstance`].
///
/// Docker writes `No such container: <name>`; podman ends its message with
/// `no such container`.
fn missing_as_unknown(err: InstanceRuntimeError, instance: &InstanceHandle) -> InstanceRuntimeError {
    match err {
        InstanceRuntimeError::CommandFailed { ref detail, .. }
            if detail.to_ascii_lowercase().contains("no such container") =>
        {
            InstanceRuntimeError::UnknownInstance(instance.name().to_owned())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::domain::{ArtifactFilename, ArtifactId};
    use crate::deployment::domain::ServicePort;

    fn instance(artifact_id: ArtifactId) -> InstanceHandle {
        let port = ServicePort::new(8105).expect("valid port");
        InstanceHandle::for_deployment("gropius", artifact_id, port).expect("valid handle")
    }

    #[test]
    fn run_args_publish_assigned_port_on_configured_host() {
        let artifact_id = ArtifactId::new();
        let image = ImageHandle::new("gropius-x:latest").expect("valid image");
        let handle = instance(artifact_id);

        let args = run_args(&image, &handle, "127.0.0.1", 8000);

        assert!(handle.name().starts_with(&format!("gropius-{artifact_id}-8105-")));
        assert_eq!(
            args,
            vec![
                "run".to_owned(),
                "-d".to_owned(),
                "--name".to_owned(),
                handle.name().to_owned(),
                "-p".to_owned(),
                "127.0.0.1:8105:8000".to_owned(),
                "gropius-x:latest".to_owned(),
            ]
        );
    }

    #[test]
    fn image_tag_is_derived_from_artifact() {
        let artifact_id = ArtifactId::new();
        let request = ImageBuildRequest {
            artifact_id,
            filename: ArtifactFilename::new("model.pkl").expect("valid filename"),
            contents: b"x".to_vec(),
        };

        assert_eq!(
            image_tag("gropius", &request),
            format!("gropius-{artifact_id}:latest")
        );
        assert_eq!(
            build_args("tag", "/tmp/ctx"),
            vec!["build", "-t", "tag", "/tmp/ctx"]
        );
    }

    #[test]
    fn inspect_reports_running_flag() {
        let handle = instance(ArtifactId::new());

        let args = inspect_args(&handle);

        assert_eq!(args.get(2).map(String::as_str), Some("{{.State.Running}}"));
        assert_eq!(args.last().map(String::as_str), Some(handle.name()));
    }

    fn runtime_with_binary(binary: &str, build_root: &std::path::Path) -> ContainerCliRuntime {
        ContainerCliRuntime::new(ContainerRuntimeConfig {
            binary: binary.to_owned(),
            host: "127.0.0.1".to_owned(),
            container_port: 8000,
            base_image: "scratch".to_owned(),
            serve_command: vec!["serve".to_owned()],
            build_root: Utf8PathBuf::from_path_buf(build_root.to_path_buf())
                .expect("temporary path should be UTF-8"),
            image_prefix: "gropius".to_owned(),
            probe_timeout: Duration::from_millis(100),
        })
    }

    #[tokio::test]
    async fn missing_binary_is_a_runtime_error() {
        let temp = tempfile::tempdir().expect("temporary directory");
        let runtime = runtime_with_binary("gropius-no-such-container-cli", temp.path());

        let result = runtime.is_running(&instance(ArtifactId::new())).await;

        assert!(matches!(result, Err(InstanceRuntimeError::Runtime(_))));
    }

    #[rstest::rstest]
    #[case::docker("Error response from daemon: No such container: gropius-x")]
    #[case::podman("Error: no container with name or ID \"gropius-x\" found: no such container")]
    fn missing_container_becomes_unknown_instance(#[case] detail: &str) {
        let handle = instance(ArtifactId::new());
        let failure = InstanceRuntimeError::CommandFailed {
            command: format!("rm {}", handle.name()),
            detail: detail.to_owned(),
        };

        let mapped = missing_as_unknown(failure, &handle);

        assert!(matches!(
            mapped,
            InstanceRuntimeError::UnknownInstance(ref name) if name == handle.name()
        ));
    }

    #[test]
    fn other_command_failures_are_kept() {
        let handle = instance(ArtifactId::new());
        let failure = InstanceRuntimeError::CommandFailed {
            command: format!("stop {}", handle.name()),
            detail: "Cannot connect to the Docker daemon".to_owned(),
        };

        let mapped = missing_as_unknown(failure, &handle);

        assert!(matches!(
            mapped,
            InstanceRuntimeError::CommandFailed { ref detail, .. }
                if detail == "Cannot connect to the Docker daemon"
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_and_remove_report_containers_the_engine_no_longer_has() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("temporary directory");
        let cli = temp.path().join("fake-engine");
        std::fs::write(
            &cli,
            "#!/bin/sh\necho \"Error response from daemon: No such container: $2\" >&2\nexit 1\n",
        )
        .expect("write fake engine");
        std::fs::set_permissions(&cli, std::fs::Permissions::from_mode(0o755))
            .expect("make fake engine executable");
        let runtime = runtime_with_binary(cli.to_str().expect("UTF-8 path"), temp.path());
        let handle = instance(ArtifactId::new());

        let stopped = runtime.stop(&handle).await;
        let removed = runtime.remove(&handle).await;

        for result in [stopped, removed] {
            assert!(matches!(
                result,
                Err(InstanceRuntimeError::UnknownInstance(ref name)) if name == handle.name()
            ));
        }
    }
}
