// ABOUTME: Adapter backed by a YAML template: hooks become runtime execs or host commands.
// ABOUTME: The `run` section creates instances; the `health` section is the predicate.

use async_trait::async_trait;

use super::host::{self, HookContext};
use super::{ApplicationAdapter, Hook, HookError, HookSlots};
use crate::runtime::{ContainerOps, ExecConfig, ExecOps};
use crate::template::{HealthCheck, HookCommand, HookTarget, StateCheck, Template};
use crate::types::{ContainerName, ImageRef};

pub struct TemplateAdapter<'r, R> {
    runtime: &'r R,
    template: &'r Template,
}

impl<'r, R: ContainerOps + ExecOps> TemplateAdapter<'r, R> {
    pub fn new(runtime: &'r R, template: &'r Template) -> Self {
        Self { runtime, template }
    }

    /// Run `command` against `name` and return its standard output.
    async fn run_command(
        &self,
        hook: Hook,
        command: &HookCommand,
        name: &ContainerName,
    ) -> Result<String, HookError> {
        match &command.target {
            HookTarget::Exec(argv) => {
                let config = ExecConfig {
                    cmd: argv.clone(),
                    env: command
                        .env
                        .iter()
                        .map(|(k, v)| format!("{}={}", k, v))
                        .collect(),
                    working_dir: None,
                    user: command.user.clone(),
                };
                let result = self
                    .runtime
                    .exec(name, &config)
                    .await
                    .map_err(|source| HookError::Exec { hook, source })?;
                if !result.success() {
                    return Err(HookError::Failed {
                        hook,
                        code: result.exit_code,
                        stderr: result.stderr_lossy().trim().to_string(),
                    });
                }
                Ok(result.stdout_lossy())
            }
            HookTarget::Host(argv) => {
                let context = HookContext {
                    container: name,
                    image: &self.template.image,
                };
                let output = host::run(argv, &context, &command.env)
                    .await
                    .map_err(|e| HookError::Launch {
                        hook,
                        reason: e.to_string(),
                    })?;
                if !output.success() {
                    return Err(HookError::Failed {
                        hook,
                        code: output.exit_code.map(i64::from).unwrap_or(-1),
                        stderr: output.stderr.trim().to_string(),
                    });
                }
                Ok(output.stdout)
            }
        }
    }

    async fn run_optional(
        &self,
        hook: Hook,
        command: Option<&HookCommand>,
        name: &ContainerName,
    ) -> Result<String, HookError> {
        let command = command.ok_or(HookError::Undefined(hook))?;
        tracing::debug!("Running {} hook for {}", hook, name);
        self.run_command(hook, command, name).await
    }
}

#[async_trait]
impl<R: ContainerOps + ExecOps> ApplicationAdapter for TemplateAdapter<'_, R> {
    fn hook_slots(&self) -> HookSlots {
        self.template.hook_slots()
    }

    fn preflight(&self, container: &ContainerName) -> Result<(), HookError> {
        Ok(self.template.validate_run(container)?)
    }

    async fn start_instance(
        &self,
        name: &ContainerName,
        image: &ImageRef,
    ) -> Result<(), HookError> {
        let run = self
            .template
            .run
            .as_ref()
            .ok_or(HookError::Undefined(Hook::StartInstance))?;
        let config = run.container_config(name, image)?;

        let container_error = |source| HookError::Container {
            hook: Hook::StartInstance,
            source,
        };

        self.runtime
            .create_container(&config)
            .await
            .map_err(container_error)?;

        if let Err(e) = self.runtime.start_container(name).await {
            // Leave nothing half-created behind.
            if let Err(cleanup) = self.runtime.remove_container(name, true).await {
                tracing::warn!("Failed to remove unstarted instance {}: {}", name, cleanup);
            }
            return Err(container_error(e));
        }

        Ok(())
    }

    async fn is_running(&self, name: &ContainerName) -> bool {
        match &self.template.health {
            None => false,
            Some(HealthCheck::State(StateCheck::Running)) => {
                match self.runtime.inspect_container(name).await {
                    Ok(info) => info.is_serving(),
                    Err(e) => {
                        tracing::debug!("Health inspect of {} failed: {}", name, e);
                        false
                    }
                }
            }
            Some(HealthCheck::Command(command)) => {
                match self.run_command(Hook::IsRunning, command, name).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::debug!("Health command for {} failed: {}", name, e);
                        false
                    }
                }
            }
        }
    }

    async fn enter_maintenance(&self, name: &ContainerName) -> Result<(), HookError> {
        let command = self.template.maintenance.enter.as_ref();
        self.run_optional(Hook::EnterMaintenance, command, name)
            .await
            .map(drop)
    }

    async fn exit_maintenance(&self, name: &ContainerName) -> Result<(), HookError> {
        let command = self.template.maintenance.exit.as_ref();
        self.run_optional(Hook::ExitMaintenance, command, name)
            .await
            .map(drop)
    }

    async fn backup(&self, name: &ContainerName) -> Result<(), HookError> {
        let command = self.template.backup.create.as_ref();
        self.run_optional(Hook::Backup, command, name)
            .await
            .map(drop)
    }

    async fn restore(&self, name: &ContainerName) -> Result<(), HookError> {
        let command = self.template.backup.restore.as_ref();
        self.run_optional(Hook::Restore, command, name)
            .await
            .map(drop)
    }

    async fn post_start(&self, name: &ContainerName) -> Result<(), HookError> {
        let command = self.template.post_start.as_ref();
        self.run_optional(Hook::PostStart, command, name)
            .await
            .map(drop)
    }

    async fn get_version(&self, name: &ContainerName) -> Result<String, HookError> {
        let command = self.template.version.as_ref();
        let stdout = self.run_optional(Hook::Version, command, name).await?;
        let version = stdout.trim();
        if version.is_empty() {
            return Err(HookError::EmptyOutput(Hook::Version));
        }
        Ok(version.to_string())
    }
}
