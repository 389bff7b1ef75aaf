//! Build-context preparation for container images.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use minijinja::{Environment, context};
use std::io;
use thiserror::Error;

/// Name the artifact payload is copied to inside the build context and image.
pub const ARTIFACT_FILE_NAME: &str = "model.artifact";

const DOCKERFILE_TEMPLATE: &str = "\
FROM {{ base_image }}
WORKDIR /app
COPY {{ artifact_file }} /app/{{ artifact_file }}
ENV MODEL_PATH=/app/{{ artifact_file }}
EXPOSE {{ container_port }}
CMD {{ command }}
";

/// Inputs for rendering a Dockerfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerfileSpec<'a> {
    /// Base image providing the serving runtime.
    pub base_image: &'a str,
    /// Port the instance server listens on inside the container.
    pub container_port: u16,
    /// Server command, one argument per element.
    pub serve_command: &'a [String],
}

/// Errors raised while preparing a build context.
#[derive(Debug, Error)]
pub enum BuildContextError {
    /// The Dockerfile template failed to render.
    #[error("failed to render Dockerfile: {0}")]
    Render(#[from] minijinja::Error),
    /// The serve command could not be encoded.
    #[error("failed to encode serve command: {0}")]
    Command(#[from] serde_json::Error),
    /// Writing the build context failed.
    #[error("failed to write build context: {0}")]
    Io(#[from] io::Error),
}

/// Renders the Dockerfile for an artifact image.
///
/// The command is emitted in exec form so arguments are never reinterpreted
/// by a shell.
///
/// # Errors
///
/// Returns [`BuildContextError`] when rendering or encoding fails.
pub fn render_dockerfile(spec: &DockerfileSpec<'_>) -> Result<String, BuildContextError> {
    let command = serde_json::to_string(spec.serve_command)?;
    let environment = Environment::new();
    let rendered = environment.render_str(
        DOCKERFILE_TEMPLATE,
        context! {
            base_image => spec.base_image,
            artifact_file => ARTIFACT_FILE_NAME,
            container_port => spec.container_port,
            command => command,
        },
    )?;
    Ok(rendered)
}

/// Writes `Dockerfile` and the artifact payload into `root/<context_name>`,
/// returning the context directory.
///
/// Runs blocking filesystem calls; call from a blocking task.
///
/// # Errors
///
/// Returns [`BuildContextError::Io`] when the directory or files cannot be
/// written.
pub fn write_build_context(
    root: &Utf8Path,
    context_name: &str,
    dockerfile: &str,
    payload: &[u8],
) -> Result<Utf8PathBuf, BuildContextError> {
    let context_dir = root.join(context_name);
    Dir::create_ambient_dir_all(&context_dir, ambient_authority())?;
    let dir = Dir::open_ambient_dir(&context_dir, ambient_authority())?;
    dir.write("Dockerfile", dockerfile)?;
    dir.write(ARTIFACT_FILE_NAME, payload)?;
    Ok(context_dir)
}
