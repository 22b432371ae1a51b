// ABOUTME: Application templates: per-application upgrade recipes stored as YAML.
// ABOUTME: A template names the image, how to run it, how to check its health, and optional hooks.

mod env_value;
mod run;

pub use env_value::{EnvValue, resolve_env_map};
pub use run::{MANAGED_LABEL, RunConfig};

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::adapter::HookSlots;
use crate::runtime::{RuntimeConfig, RuntimeType};
use crate::types::{ContainerName, ImageRef};

/// Directory searched for templates when none is given.
pub const DEFAULT_TEMPLATES_DIR: &str = ".rollover/templates";

/// Health attempts when neither the template nor the command line sets one.
pub const DEFAULT_TIMEOUT: u32 = 60;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template '{id}' not found in {}", dir.display())]
    NotFound { id: String, dir: PathBuf },

    #[error("failed to read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid template {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid port mapping: {0}")]
    InvalidPort(String),

    #[error("invalid volume mount: {0}")]
    InvalidVolume(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Template {
    pub image: ImageRef,

    /// Start hook. Without it the template cannot create instances.
    #[serde(default)]
    pub run: Option<RunConfig>,

    /// Health predicate. Without it the template cannot be polled.
    #[serde(default)]
    pub health: Option<HealthCheck>,

    #[serde(default)]
    pub maintenance: MaintenanceHooks,

    #[serde(default)]
    pub backup: BackupHooks,

    #[serde(default)]
    pub post_start: Option<HookCommand>,

    #[serde(default)]
    pub version: Option<HookCommand>,

    #[serde(default)]
    pub timeout: Option<u32>,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Longest one health evaluation may run before it counts as failed.
    #[serde(default = "default_check_timeout", with = "humantime_serde")]
    pub check_timeout: Duration,

    #[serde(default)]
    pub runtime: Option<RuntimeType>,

    #[serde(default)]
    pub socket: Option<String>,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_check_timeout() -> Duration {
    Duration::from_secs(5)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaintenanceHooks {
    #[serde(default)]
    pub enter: Option<HookCommand>,
    #[serde(default)]
    pub exit: Option<HookCommand>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupHooks {
    #[serde(default)]
    pub create: Option<HookCommand>,
    #[serde(default)]
    pub restore: Option<HookCommand>,
}

/// A command run either inside the target container or on the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HookCommand {
    #[serde(flatten)]
    pub target: HookTarget,

    /// User inside the container; ignored for host commands.
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookTarget {
    Exec(Vec<String>),
    Host(Vec<String>),
}

/// How to decide whether an instance is up.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HealthCheck {
    State(StateCheck),
    Command(HookCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateCheck {
    /// The runtime reports the instance running and not unhealthy.
    Running,
}

impl Template {
    pub fn from_yaml(yaml: &str, path: &Path) -> Result<Self, TemplateError> {
        serde_yaml::from_str(yaml).map_err(|source| TemplateError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content, path)
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            runtime: self.runtime,
            socket: self.socket.clone(),
        }
    }

    /// Which adapter hooks this template defines.
    pub fn hook_slots(&self) -> HookSlots {
        HookSlots {
            start_instance: self.run.is_some(),
            is_running: self.health.is_some(),
            enter_maintenance: self.maintenance.enter.is_some(),
            exit_maintenance: self.maintenance.exit.is_some(),
            backup: self.backup.create.is_some(),
            restore: self.backup.restore.is_some(),
            post_start: self.post_start.is_some(),
            version: self.version.is_some(),
        }
    }

    /// Build the container configuration once without creating anything, so
    /// bad ports, volumes or env references surface before the old instance stops.
    pub fn validate_run(&self, container: &ContainerName) -> Result<(), TemplateError> {
        match &self.run {
            Some(run) => run.container_config(container, &self.image).map(drop),
            None => Ok(()),
        }
    }

    pub fn stop_timeout(&self) -> Duration {
        self.run
            .as_ref()
            .map(|run| run.stop_timeout)
            .unwrap_or(Duration::from_secs(30))
    }
}

/// Resolves template identifiers to files in one directory.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the template file for `id`, if one exists.
    pub fn locate(&self, id: &str) -> Option<PathBuf> {
        // Identifiers name files in this directory and nothing else.
        if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
            return None;
        }
        ["yml", "yaml"]
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", id, ext)))
            .find(|path| path.is_file())
    }

    pub fn load(&self, id: &str) -> Result<Template, TemplateError> {
        let path = self.locate(id).ok_or_else(|| TemplateError::NotFound {
            id: id.to_string(),
            dir: self.dir.clone(),
        })?;
        tracing::debug!("Loading template {}", path.display());
        Template::load(&path)
    }
}
