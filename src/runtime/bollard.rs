// ABOUTME: Bollard-based container runtime implementation.
// ABOUTME: Supports both Docker and Podman via the Docker-compatible API.

use crate::runtime::error::RuntimeError;
use crate::runtime::traits::sealed::Sealed;
use crate::runtime::traits::{
    ContainerConfig, ContainerError, ContainerInfo, ContainerOps, ContainerState, ExecConfig,
    ExecError, ExecOps, ExecResult, HealthState, ImageError, ImageOps, Protocol,
    RestartPolicyConfig,
};
use crate::runtime::types::{RuntimeInfo, RuntimeType};
use crate::types::{ContainerId, ContainerName, ImageId, ImageRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::exec::StartExecOptions;
use bollard::models::{
    ContainerCreateBody, ContainerStateStatusEnum, HealthStatusEnum, HostConfig, Mount,
    MountTypeEnum, PortBinding, RestartPolicy, RestartPolicyNameEnum,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, RemoveContainerOptions,
    RenameContainerOptions, StartContainerOptions, StopContainerOptions,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;

/// Status code and message of an error response from the daemon.
fn daemon_status(e: &bollard::errors::Error) -> Option<(u16, String)> {
    match e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => Some((*status_code, message.clone())),
        _ => None,
    }
}

fn container_error(e: bollard::errors::Error) -> ContainerError {
    match daemon_status(&e) {
        Some((404, message)) => ContainerError::NotFound(message),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn start_error(e: bollard::errors::Error) -> ContainerError {
    match daemon_status(&e) {
        Some((304, message)) => ContainerError::AlreadyRunning(message),
        _ => container_error(e),
    }
}

fn stop_error(e: bollard::errors::Error) -> ContainerError {
    match daemon_status(&e) {
        Some((304, message)) => ContainerError::NotRunning(message),
        _ => container_error(e),
    }
}

fn rename_error(e: bollard::errors::Error) -> ContainerError {
    match daemon_status(&e) {
        Some((409, message)) => ContainerError::AlreadyExists(message),
        _ => container_error(e),
    }
}

fn create_error(e: bollard::errors::Error) -> ContainerError {
    match daemon_status(&e) {
        // The named image is missing locally.
        Some((404, message)) => ContainerError::ImageNotFound(message),
        Some((409, message)) => ContainerError::AlreadyExists(message),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn image_error(e: bollard::errors::Error, image: &str) -> ImageError {
    match daemon_status(&e) {
        Some((404, _)) => ImageError::NotFound(image.to_string()),
        _ => ImageError::Runtime(format!("failed to inspect {}: {}", image, e)),
    }
}

fn exec_error(e: bollard::errors::Error) -> ExecError {
    match daemon_status(&e) {
        Some((404, message)) => ExecError::ContainerNotFound(message),
        Some((409, message)) => ExecError::ContainerNotRunning(message),
        _ => ExecError::Runtime(e.to_string()),
    }
}

fn container_state(status: Option<ContainerStateStatusEnum>) -> ContainerState {
    match status {
        Some(ContainerStateStatusEnum::CREATED) => ContainerState::Created,
        Some(ContainerStateStatusEnum::RUNNING) => ContainerState::Running,
        Some(ContainerStateStatusEnum::PAUSED) => ContainerState::Paused,
        Some(ContainerStateStatusEnum::RESTARTING) => ContainerState::Restarting,
        Some(ContainerStateStatusEnum::REMOVING) => ContainerState::Removing,
        Some(ContainerStateStatusEnum::DEAD) => ContainerState::Dead,
        _ => ContainerState::Exited,
    }
}

fn health_state(status: HealthStatusEnum) -> HealthState {
    match status {
        HealthStatusEnum::STARTING => HealthState::Starting,
        HealthStatusEnum::HEALTHY => HealthState::Healthy,
        HealthStatusEnum::UNHEALTHY => HealthState::Unhealthy,
        _ => HealthState::None,
    }
}

/// Translate a container configuration into the daemon's create request.
fn create_body(config: &ContainerConfig) -> ContainerCreateBody {
    let restart_policy = match &config.restart_policy {
        RestartPolicyConfig::No => (RestartPolicyNameEnum::NO, None),
        RestartPolicyConfig::Always => (RestartPolicyNameEnum::ALWAYS, None),
        RestartPolicyConfig::UnlessStopped => (RestartPolicyNameEnum::UNLESS_STOPPED, None),
        RestartPolicyConfig::OnFailure { max_retries } => (
            RestartPolicyNameEnum::ON_FAILURE,
            max_retries.map(i64::from),
        ),
    };

    let mounts: Vec<Mount> = config
        .volumes
        .iter()
        .map(|m| Mount {
            source: Some(m.source.clone()),
            target: Some(m.target.clone()),
            typ: Some(MountTypeEnum::BIND),
            read_only: Some(m.read_only),
            ..Default::default()
        })
        .collect();

    let mut exposed_ports = Vec::with_capacity(config.ports.len());
    let mut port_bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
    for port in &config.ports {
        let proto = match port.protocol {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        };
        let key = format!("{}/{}", port.container_port, proto);
        if let Some(host_port) = port.host_port {
            port_bindings.insert(
                key.clone(),
                Some(vec![PortBinding {
                    host_ip: port.host_ip.clone(),
                    host_port: Some(host_port.to_string()),
                }]),
            );
        }
        exposed_ports.push(key);
    }

    let env: Vec<String> = config
        .env
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    let host_config = HostConfig {
        restart_policy: Some(RestartPolicy {
            name: Some(restart_policy.0),
            maximum_retry_count: restart_policy.1,
        }),
        network_mode: config.network.clone(),
        mounts: (!mounts.is_empty()).then_some(mounts),
        port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
        ..Default::default()
    };

    ContainerCreateBody {
        image: Some(config.image.to_string()),
        env: (!env.is_empty()).then_some(env),
        labels: (!config.labels.is_empty()).then(|| config.labels.clone()),
        cmd: config.command.clone(),
        host_config: Some(host_config),
        exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
        stop_timeout: config.stop_timeout.map(|d| d.as_secs() as i64),
        ..Default::default()
    }
}

// =============================================================================
// BollardRuntime
// =============================================================================

/// Container runtime implementation using bollard.
///
/// Supports both Docker and Podman via the Docker-compatible API.
#[derive(Clone)]
pub struct BollardRuntime {
    client: Docker,
    runtime_type: RuntimeType,
}

impl BollardRuntime {
    /// Create a new BollardRuntime from a Docker client.
    pub fn new(client: Docker, runtime_type: RuntimeType) -> Self {
        Self {
            client,
            runtime_type,
        }
    }

    /// Connect to a container runtime using detected runtime info.
    pub fn connect(info: &RuntimeInfo) -> Result<Self, RuntimeError> {
        let client =
            Docker::connect_with_unix(&info.socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|source| RuntimeError::Connection {
                    socket: info.socket_path.clone(),
                    source,
                })?;
        Ok(Self::new(client, info.runtime_type))
    }

    /// Get the runtime type (Docker or Podman).
    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    /// Execute in detached mode and poll for completion.
    /// Podman's attached exec streams do not always close, so output is not captured.
    async fn exec_start_detached(&self, exec_id: &str) -> Result<ExecResult, ExecError> {
        let opts = StartExecOptions {
            detach: true,
            ..Default::default()
        };

        self.client
            .start_exec(exec_id, Some(opts))
            .await
            .map_err(exec_error)?;

        let poll_interval = Duration::from_millis(100);
        let max_wait = Duration::from_secs(300);
        let start = std::time::Instant::now();

        loop {
            let (running, exit_code) = self.exec_status(exec_id).await?;
            if !running {
                return Ok(ExecResult {
                    exit_code: exit_code.unwrap_or(0),
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                });
            }

            if start.elapsed() > max_wait {
                return Err(ExecError::Failed("exec timed out".to_string()));
            }

            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn exec_status(&self, exec_id: &str) -> Result<(bool, Option<i64>), ExecError> {
        let details = self
            .client
            .inspect_exec(exec_id)
            .await
            .map_err(exec_error)?;
        Ok((details.running.unwrap_or(false), details.exit_code))
    }
}

impl Sealed for BollardRuntime {}

#[async_trait]
impl ImageOps for BollardRuntime {
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        let image_name = reference.to_string();

        let opts = CreateImageOptions {
            from_image: Some(image_name.clone()),
            ..Default::default()
        };

        // Pull returns a stream of progress updates; it is done when the stream ends.
        let mut stream = self.client.create_image(Some(opts), None, None);
        while let Some(result) = stream.next().await {
            let info = result
                .map_err(|e| ImageError::PullFailed(format!("{}: {}", image_name, e)))?;
            if let Some(status) = info.status {
                tracing::trace!("pull {}: {}", image_name, status);
            }
        }

        Ok(())
    }

    async fn inspect_image(&self, reference: &ImageRef) -> Result<ImageId, ImageError> {
        let image_name = reference.to_string();

        let details = self
            .client
            .inspect_image(&image_name)
            .await
            .map_err(|e| image_error(e, &image_name))?;

        details
            .id
            .map(ImageId::new)
            .ok_or_else(|| ImageError::Runtime(format!("{} has no image id", image_name)))
    }
}

#[async_trait]
impl ContainerOps for BollardRuntime {
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let body = create_body(config);

        let opts = CreateContainerOptions {
            name: Some(config.name.to_string()),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(Some(opts), body)
            .await
            .map_err(create_error)?;

        for warning in &response.warnings {
            tracing::warn!("creating {}: {}", config.name, warning);
        }

        Ok(ContainerId::new(response.id))
    }

    async fn start_container(&self, name: &ContainerName) -> Result<(), ContainerError> {
        self.client
            .start_container(name.as_str(), None::<StartContainerOptions>)
            .await
            .map_err(start_error)
    }

    async fn stop_container(
        &self,
        name: &ContainerName,
        timeout: Duration,
    ) -> Result<(), ContainerError> {
        let opts = StopContainerOptions {
            t: Some(timeout.as_secs() as i32),
            signal: None,
        };

        self.client
            .stop_container(name.as_str(), Some(opts))
            .await
            .map_err(stop_error)
    }

    async fn remove_container(
        &self,
        name: &ContainerName,
        force: bool,
    ) -> Result<(), ContainerError> {
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_container(name.as_str(), Some(opts))
            .await
            .map_err(container_error)
    }

    async fn inspect_container(
        &self,
        name: &ContainerName,
    ) -> Result<ContainerInfo, ContainerError> {
        let details = self
            .client
            .inspect_container(name.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(container_error)?;

        let state = container_state(details.state.as_ref().and_then(|s| s.status));
        let health = details
            .state
            .as_ref()
            .and_then(|s| s.health.as_ref())
            .and_then(|h| h.status)
            .map(health_state);

        let image = details
            .image
            .ok_or_else(|| ContainerError::Runtime(format!("{} reports no image", name)))?;

        Ok(ContainerInfo {
            id: ContainerId::new(details.id.unwrap_or_default()),
            name: details
                .name
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            image: ImageId::new(image),
            state,
            health,
        })
    }

    async fn rename_container(
        &self,
        name: &ContainerName,
        new_name: &ContainerName,
    ) -> Result<(), ContainerError> {
        self.client
            .rename_container(
                name.as_str(),
                RenameContainerOptions {
                    name: new_name.to_string(),
                },
            )
            .await
            .map_err(rename_error)
    }
}

#[async_trait]
impl ExecOps for BollardRuntime {
    async fn exec(
        &self,
        container: &ContainerName,
        config: &ExecConfig,
    ) -> Result<ExecResult, ExecError> {
        let opts = bollard::models::ExecConfig {
            cmd: Some(config.cmd.clone()),
            env: if config.env.is_empty() {
                None
            } else {
                Some(config.env.clone())
            },
            working_dir: config.working_dir.clone(),
            user: config.user.clone(),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec_id = self
            .client
            .create_exec(container.as_str(), opts)
            .await
            .map_err(exec_error)?
            .id;

        if self.runtime_type == RuntimeType::Podman {
            return self.exec_start_detached(&exec_id).await;
        }

        let result = self
            .client
            .start_exec(
                &exec_id,
                Some(StartExecOptions {
                    detach: false,
                    ..Default::default()
                }),
            )
            .await
            .map_err(exec_error)?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        if let bollard::exec::StartExecResults::Attached { mut output, .. } = result {
            while let Some(item) = output.next().await {
                match item {
                    Ok(bollard::container::LogOutput::StdOut { message }) => {
                        stdout.extend(message);
                    }
                    Ok(bollard::container::LogOutput::StdErr { message }) => {
                        stderr.extend(message);
                    }
                    Ok(_) => {}
                    Err(e) => return Err(ExecError::Failed(e.to_string())),
                }
            }
        }

        let (_, exit_code) = self.exec_status(&exec_id).await?;

        Ok(ExecResult {
            exit_code: exit_code.unwrap_or(0),
            stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::traits::{PortMapping, VolumeMount};

    fn daemon(status_code: u16, message: &str) -> bollard::errors::Error {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message: message.to_string(),
        }
    }

    #[test]
    fn status_codes_map_per_call() {
        assert!(matches!(
            container_error(daemon(404, "no such container")),
            ContainerError::NotFound(_)
        ));
        assert!(matches!(
            start_error(daemon(304, "already started")),
            ContainerError::AlreadyRunning(_)
        ));
        assert!(matches!(
            stop_error(daemon(304, "already stopped")),
            ContainerError::NotRunning(_)
        ));
        assert!(matches!(
            rename_error(daemon(409, "name in use")),
            ContainerError::AlreadyExists(_)
        ));
        assert!(matches!(
            create_error(daemon(404, "no such image")),
            ContainerError::ImageNotFound(_)
        ));
        assert!(matches!(
            exec_error(daemon(409, "container is paused")),
            ExecError::ContainerNotRunning(_)
        ));
        assert!(matches!(
            start_error(daemon(500, "boom")),
            ContainerError::Runtime(_)
        ));
    }

    #[test]
    fn create_body_binds_published_ports_only() {
        let config = ContainerConfig {
            name: ContainerName::new("web-sha256-beef").unwrap(),
            image: ImageRef::parse("nginx:1.27").unwrap(),
            env: HashMap::from([("MODE".to_string(), "prod".to_string())]),
            labels: HashMap::new(),
            ports: vec![
                PortMapping {
                    host_port: Some(8080),
                    container_port: 80,
                    protocol: Protocol::Tcp,
                    host_ip: None,
                },
                PortMapping {
                    host_port: None,
                    container_port: 53,
                    protocol: Protocol::Udp,
                    host_ip: None,
                },
            ],
            volumes: vec![VolumeMount {
                source: "/srv/web".to_string(),
                target: "/usr/share/nginx/html".to_string(),
                read_only: true,
            }],
            command: None,
            restart_policy: RestartPolicyConfig::OnFailure {
                max_retries: Some(3),
            },
            stop_timeout: Some(Duration::from_secs(45)),
            network: None,
        };

        let body = create_body(&config);
        assert_eq!(body.image.as_deref(), Some("nginx:1.27"));
        assert_eq!(body.env, Some(vec!["MODE=prod".to_string()]));
        assert!(body.labels.is_none());
        assert_eq!(body.stop_timeout, Some(45));
        assert_eq!(
            body.exposed_ports,
            Some(vec!["80/tcp".to_string(), "53/udp".to_string()])
        );

        let host = body.host_config.unwrap();
        let bindings = host.port_bindings.unwrap();
        assert_eq!(bindings.len(), 1);
        assert!(bindings.contains_key("80/tcp"));
        assert_eq!(host.mounts.unwrap()[0].read_only, Some(true));

        let restart = host.restart_policy.unwrap();
        assert_eq!(restart.name, Some(RestartPolicyNameEnum::ON_FAILURE));
        assert_eq!(restart.maximum_retry_count, Some(3));
    }

    #[test]
    fn unknown_states_read_as_exited() {
        assert_eq!(container_state(None), ContainerState::Exited);
        assert_eq!(
            container_state(Some(ContainerStateStatusEnum::RUNNING)),
            ContainerState::Running
        );
        assert_eq!(health_state(HealthStatusEnum::NONE), HealthState::None);
    }
}
