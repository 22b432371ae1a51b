// ABOUTME: Container operations trait for container runtimes.
// ABOUTME: Create, start, stop, rename, remove, and inspect named containers.

use super::sealed::Sealed;
use super::shared_types::{ContainerConfig, ContainerInfo};
use crate::types::{ContainerId, ContainerName};
use async_trait::async_trait;
use std::time::Duration;

/// Container lifecycle operations.
///
/// Containers are addressed by name; the upgrade workflow never needs to
/// track raw IDs because every instance it touches has a unique name.
#[async_trait]
pub trait ContainerOps: Sealed + Send + Sync {
    /// Create a container from the given configuration.
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError>;

    /// Start a created or stopped container.
    async fn start_container(&self, name: &ContainerName) -> Result<(), ContainerError>;

    /// Stop a running container, waiting up to `timeout` before killing it.
    async fn stop_container(
        &self,
        name: &ContainerName,
        timeout: Duration,
    ) -> Result<(), ContainerError>;

    /// Remove a container.
    async fn remove_container(
        &self,
        name: &ContainerName,
        force: bool,
    ) -> Result<(), ContainerError>;

    /// Get detailed information about a container.
    async fn inspect_container(&self, name: &ContainerName)
    -> Result<ContainerInfo, ContainerError>;

    /// Rename a container.
    async fn rename_container(
        &self,
        name: &ContainerName,
        new_name: &ContainerName,
    ) -> Result<(), ContainerError>;
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container already exists: {0}")]
    AlreadyExists(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("container already running: {0}")]
    AlreadyRunning(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
