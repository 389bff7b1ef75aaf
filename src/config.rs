//! Service configuration loaded from TOML and `GROPIUS_*` environment
//! variables.

use crate::deployment::{
    adapters::container::ContainerRuntimeConfig,
    domain::PortRange,
    services::{DEFAULT_INSTANCE_PREFIX, DeployPolicy, HealthCheckPolicy},
};
use crate::telemetry::{LogFormat, LoggingSettings};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was read.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`Settings`].
    #[error("failed to parse config: {0}")]
    Parse(#[source] Box<toml::de::Error>),

    /// A value is out of range or malformed.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Port range instances are bound from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortSettings {
    /// First port of the range.
    pub base: u16,
    /// Number of ports in the range.
    pub capacity: u16,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            base: 8100,
            capacity: 100,
        }
    }
}

/// Health-check polling schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthCheckSettings {
    /// Maximum number of probes.
    pub max_attempts: u32,
    /// Delay between probes in milliseconds.
    pub interval_ms: u64,
    /// Timeout for a single probe in milliseconds.
    pub probe_timeout_ms: u64,
}

impl Default for HealthCheckSettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval_ms: 1_000,
            probe_timeout_ms: 2_000,
        }
    }
}

/// Deploy attempt bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeploySettings {
    /// Overall deploy timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self { timeout_ms: 120_000 }
    }
}

/// Inference proxy bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceSettings {
    /// Timeout for one forwarded prediction in milliseconds.
    pub timeout_ms: u64,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self { timeout_ms: 30_000 }
    }
}

/// Container runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSettings {
    /// Container CLI binary.
    pub binary: String,
    /// Host interface instance ports are published on.
    pub host: String,
    /// Port the instance server listens on inside the container.
    pub container_port: u16,
    /// Base image providing the serving runtime.
    pub base_image: String,
    /// Server command run inside the container.
    pub serve_command: Vec<String>,
    /// Directory holding image build contexts.
    pub build_root: Utf8PathBuf,
    /// Prefix for image tags and instance names.
    pub name_prefix: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            binary: "docker".to_owned(),
            host: "127.0.0.1".to_owned(),
            container_port: 8000,
            base_image: "gropius/model-server:latest".to_owned(),
            serve_command: ["uvicorn", "server:app", "--host", "0.0.0.0", "--port", "8000"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            build_root: Utf8PathBuf::from("build"),
            name_prefix: DEFAULT_INSTANCE_PREFIX.to_owned(),
        }
    }
}

/// Artifact storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSettings {
    /// Directory artifact payloads are written to.
    pub artifact_dir: Utf8PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            artifact_dir: Utf8PathBuf::from("models"),
        }
    }
}

/// Complete service configuration. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Port range settings.
    pub ports: PortSettings,
    /// Health-check settings.
    pub health_check: HealthCheckSettings,
    /// Deploy settings.
    pub deploy: DeploySettings,
    /// Inference settings.
    pub inference: InferenceSettings,
    /// Container runtime settings.
    pub runtime: RuntimeSettings,
    /// Artifact storage settings.
    pub storage: StorageSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl Settings {
    /// Parses and validates settings from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::InvalidValue`] when validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(Box::new(err)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads and validates settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadFile`] when the file cannot be read, or
    /// any error from [`Settings::from_toml_str`].
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let read_error = |source| ConfigError::ReadFile {
            path: path.to_owned(),
            source,
        };
        let parent = path
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let file_name = path.file_name().ok_or_else(|| {
            read_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path has no file name",
            ))
        })?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
        let content = dir.read_to_string(file_name).map_err(read_error)?;
        Self::from_toml_str(&content)
    }

    /// Loads `.env`, then the optional TOML file, then `GROPIUS_*`
    /// overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable or any value is
    /// invalid.
    pub fn load_with_env(path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            debug!(error = %err, "no .env file loaded");
        }
        let mut settings = match path {
            Some(file) => Self::load(file)?,
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Applies `GROPIUS_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when an override does not
    /// parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("GROPIUS_PORT_BASE") {
            self.ports.base = parse_override("ports.base", &value)?;
        }
        if let Some(value) = lookup("GROPIUS_PORT_CAPACITY") {
            self.ports.capacity = parse_override("ports.capacity", &value)?;
        }
        if let Some(value) = lookup("GROPIUS_HEALTH_MAX_ATTEMPTS") {
            self.health_check.max_attempts = parse_override("health_check.max_attempts", &value)?;
        }
        if let Some(value) = lookup("GROPIUS_HEALTH_INTERVAL_MS") {
            self.health_check.interval_ms = parse_override("health_check.interval_ms", &value)?;
        }
        if let Some(value) = lookup("GROPIUS_DEPLOY_TIMEOUT_MS") {
            self.deploy.timeout_ms = parse_override("deploy.timeout_ms", &value)?;
        }
        if let Some(value) = lookup("GROPIUS_INFERENCE_TIMEOUT_MS") {
            self.inference.timeout_ms = parse_override("inference.timeout_ms", &value)?;
        }
        if let Some(value) = lookup("GROPIUS_RUNTIME_BINARY") {
            self.runtime.binary = value;
        }
        if let Some(value) = lookup("GROPIUS_RUNTIME_HOST") {
            self.runtime.host = value;
        }
        if let Some(value) = lookup("GROPIUS_ARTIFACT_DIR") {
            self.storage.artifact_dir = Utf8PathBuf::from(value);
        }
        if let Some(value) = lookup("GROPIUS_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = lookup("GROPIUS_LOG_FORMAT") {
            self.logging.format =
                LogFormat::parse(&value).ok_or_else(|| ConfigError::InvalidValue {
                    field: "logging.format",
                    reason: format!("expected `pretty` or `json`, got `{value}`"),
                })?;
        }
        Ok(())
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.port_range()?;
        if self.health_check.max_attempts == 0 {
            return Err(invalid("health_check.max_attempts", "must be at least 1"));
        }
        if self.health_check.probe_timeout_ms == 0 {
            return Err(invalid("health_check.probe_timeout_ms", "must be greater than 0"));
        }
        if self.deploy.timeout_ms == 0 {
            return Err(invalid("deploy.timeout_ms", "must be greater than 0"));
        }
        if self.inference.timeout_ms == 0 {
            return Err(invalid("inference.timeout_ms", "must be greater than 0"));
        }
        if self.runtime.binary.trim().is_empty() {
            return Err(invalid("runtime.binary", "must not be empty"));
        }
        if self.runtime.container_port == 0 {
            return Err(invalid("runtime.container_port", "must not be 0"));
        }
        if self.runtime.serve_command.is_empty() {
            return Err(invalid("runtime.serve_command", "must not be empty"));
        }
        Ok(())
    }

    /// Returns the validated port range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when the range is empty, starts
    /// at zero, or overflows.
    pub fn port_range(&self) -> Result<PortRange, ConfigError> {
        PortRange::new(self.ports.base, self.ports.capacity)
            .map_err(|err| invalid("ports", &err.to_string()))
    }

    /// Returns the health polling schedule.
    #[must_use]
    pub const fn health_check_policy(&self) -> HealthCheckPolicy {
        HealthCheckPolicy {
            max_attempts: self.health_check.max_attempts,
            interval: Duration::from_millis(self.health_check.interval_ms),
            probe_timeout: Duration::from_millis(self.health_check.probe_timeout_ms),
        }
    }

    /// Returns the deploy policy.
    #[must_use]
    pub fn deploy_policy(&self) -> DeployPolicy {
        DeployPolicy {
            health_check: self.health_check_policy(),
            deploy_timeout: Duration::from_millis(self.deploy.timeout_ms),
            instance_prefix: self.runtime.name_prefix.clone(),
        }
    }

    /// Returns the inference request timeout.
    #[must_use]
    pub const fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference.timeout_ms)
    }

    /// Returns the container runtime configuration.
    #[must_use]
    pub fn container_runtime(&self) -> ContainerRuntimeConfig {
        ContainerRuntimeConfig {
            binary: self.runtime.binary.clone(),
            host: self.runtime.host.clone(),
            container_port: self.runtime.container_port,
            base_image: self.runtime.base_image.clone(),
            serve_command: self.runtime.serve_command.clone(),
            build_root: self.runtime.build_root.clone(),
            image_prefix: self.runtime.name_prefix.clone(),
            probe_timeout: Duration::from_millis(self.health_check.probe_timeout_ms),
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_owned(),
    }
}

fn parse_override<T>(field: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err: T::Err| invalid(field, &format!("`{value}`: {err}")))
}
