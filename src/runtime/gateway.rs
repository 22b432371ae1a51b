// ABOUTME: Runtime gateway: the named-instance operations the upgrade workflow issues.
// ABOUTME: Pure translation onto the runtime traits; no retries, no policy.

use std::time::Duration;

use crate::types::{ContainerName, ImageId, ImageRef};

use super::traits::{ContainerError, ContainerOps, ImageError, ImageOps};

/// Errors from gateway operations, tagged with what was being attempted.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("failed to pull {image}: {source}")]
    Pull { image: String, source: ImageError },

    #[error("failed to inspect image {image}: {source}")]
    InspectImage { image: String, source: ImageError },

    #[error("failed to {action} container {container}: {source}")]
    Container {
        action: &'static str,
        container: String,
        source: ContainerError,
    },
}

/// Borrowed view over a runtime exposing the upgrade workflow's vocabulary.
///
/// Each call is issued exactly once; failures are returned to the caller,
/// which decides whether they gate the workflow.
pub struct RuntimeGateway<'r, R> {
    runtime: &'r R,
    stop_timeout: Duration,
}

impl<'r, R: ImageOps + ContainerOps> RuntimeGateway<'r, R> {
    pub fn new(runtime: &'r R, stop_timeout: Duration) -> Self {
        Self {
            runtime,
            stop_timeout,
        }
    }

    pub async fn pull_image(&self, image: &ImageRef) -> Result<(), GatewayError> {
        tracing::debug!("Pulling {}", image);
        self.runtime
            .pull_image(image)
            .await
            .map_err(|source| GatewayError::Pull {
                image: image.to_string(),
                source,
            })
    }

    /// Identity of the image backing the running `container`.
    pub async fn running_image(&self, container: &ContainerName) -> Result<ImageId, GatewayError> {
        let info = self
            .runtime
            .inspect_container(container)
            .await
            .map_err(container_error("inspect", container))?;
        Ok(info.image)
    }

    /// Identity of the local image `image` resolves to after a pull.
    pub async fn pulled_image(&self, image: &ImageRef) -> Result<ImageId, GatewayError> {
        self.runtime
            .inspect_image(image)
            .await
            .map_err(|source| GatewayError::InspectImage {
                image: image.to_string(),
                source,
            })
    }

    pub async fn stop_instance(&self, name: &ContainerName) -> Result<(), GatewayError> {
        tracing::debug!("Stopping {}", name);
        self.runtime
            .stop_container(name, self.stop_timeout)
            .await
            .map_err(container_error("stop", name))
    }

    /// Start an existing, stopped instance.
    pub async fn start_instance(&self, name: &ContainerName) -> Result<(), GatewayError> {
        tracing::debug!("Starting {}", name);
        self.runtime
            .start_container(name)
            .await
            .map_err(container_error("start", name))
    }

    pub async fn rename_instance(
        &self,
        from: &ContainerName,
        to: &ContainerName,
    ) -> Result<(), GatewayError> {
        tracing::debug!("Renaming {} to {}", from, to);
        self.runtime
            .rename_container(from, to)
            .await
            .map_err(container_error("rename", from))
    }

    pub async fn remove_instance(&self, name: &ContainerName) -> Result<(), GatewayError> {
        tracing::debug!("Removing {}", name);
        self.runtime
            .remove_container(name, true)
            .await
            .map_err(container_error("remove", name))
    }

    /// Abbreviated container ID, used as a version when an application has no version hook.
    pub async fn short_id(&self, name: &ContainerName) -> Result<String, GatewayError> {
        let info = self
            .runtime
            .inspect_container(name)
            .await
            .map_err(container_error("inspect", name))?;
        Ok(info.id.short().to_string())
    }
}

fn container_error(
    action: &'static str,
    container: &ContainerName,
) -> impl FnOnce(ContainerError) -> GatewayError {
    let container = container.to_string();
    move |source| GatewayError::Container {
        action,
        container,
        source,
    }
}
