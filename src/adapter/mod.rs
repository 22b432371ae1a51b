// ABOUTME: Application adapters: the per-application hooks an upgrade drives.
// ABOUTME: Reports which hooks exist and validates them into capability flags.

#[cfg(test)]
pub(crate) mod fake;
mod host;
mod template;

pub use template::TemplateAdapter;

use async_trait::async_trait;
use std::fmt;

use crate::runtime::{ContainerError, ExecError};
use crate::template::TemplateError;
use crate::types::{ContainerName, ImageRef};

/// Every hook an adapter can define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    StartInstance,
    IsRunning,
    EnterMaintenance,
    ExitMaintenance,
    Backup,
    Restore,
    PostStart,
    Version,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Hook::StartInstance => "start-instance",
            Hook::IsRunning => "is-running",
            Hook::EnterMaintenance => "enter-maintenance",
            Hook::ExitMaintenance => "exit-maintenance",
            Hook::Backup => "backup",
            Hook::Restore => "restore",
            Hook::PostStart => "post-start",
            Hook::Version => "version",
        };
        f.write_str(name)
    }
}

/// Which hook slots an adapter fills. Reported once, when the adapter is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookSlots {
    pub start_instance: bool,
    pub is_running: bool,
    pub enter_maintenance: bool,
    pub exit_maintenance: bool,
    pub backup: bool,
    pub restore: bool,
    pub post_start: bool,
    pub version: bool,
}

/// Optional steps an upgrade may take for this adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterCapabilities {
    pub maintenance: bool,
    pub backup: bool,
    pub post_start: bool,
    pub version: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    #[error("mandatory {0} hook is not defined")]
    MissingMandatory(Hook),

    #[error("{present} hook is defined without a matching {missing} hook")]
    Unpaired { present: Hook, missing: Hook },
}

impl AdapterCapabilities {
    /// Validate hook slots. Mandatory hooks must exist; paired hooks come together.
    pub fn detect(slots: HookSlots) -> Result<Self, CapabilityError> {
        if !slots.start_instance {
            return Err(CapabilityError::MissingMandatory(Hook::StartInstance));
        }
        if !slots.is_running {
            return Err(CapabilityError::MissingMandatory(Hook::IsRunning));
        }

        let maintenance = paired(
            (Hook::EnterMaintenance, slots.enter_maintenance),
            (Hook::ExitMaintenance, slots.exit_maintenance),
        )?;
        let backup = paired((Hook::Backup, slots.backup), (Hook::Restore, slots.restore))?;

        Ok(Self {
            maintenance,
            backup,
            post_start: slots.post_start,
            version: slots.version,
        })
    }
}

fn paired(a: (Hook, bool), b: (Hook, bool)) -> Result<bool, CapabilityError> {
    match (a.1, b.1) {
        (true, false) => Err(CapabilityError::Unpaired {
            present: a.0,
            missing: b.0,
        }),
        (false, true) => Err(CapabilityError::Unpaired {
            present: b.0,
            missing: a.0,
        }),
        (both, _) => Ok(both),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("{0} hook is not defined")]
    Undefined(Hook),

    #[error("{hook} hook exited with code {code}: {stderr}")]
    Failed {
        hook: Hook,
        code: i64,
        stderr: String,
    },

    #[error("{hook} hook could not be run: {reason}")]
    Launch { hook: Hook, reason: String },

    #[error("{0} hook printed nothing")]
    EmptyOutput(Hook),

    #[error("{hook} hook: {source}")]
    Exec { hook: Hook, source: ExecError },

    #[error("{hook} hook: {source}")]
    Container { hook: Hook, source: ContainerError },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Application-specific behavior around an instance swap.
///
/// Optional hooks default to [`HookError::Undefined`]; an adapter that
/// overrides one must report it in [`hook_slots`](Self::hook_slots).
#[async_trait]
pub trait ApplicationAdapter: Send + Sync {
    fn hook_slots(&self) -> HookSlots;

    /// Check that an instance for `container` could be started at all.
    /// Called before the first runtime call of an attempt.
    fn preflight(&self, _container: &ContainerName) -> Result<(), HookError> {
        Ok(())
    }

    /// Create and start a new instance `name` from `image`.
    async fn start_instance(&self, name: &ContainerName, image: &ImageRef)
    -> Result<(), HookError>;

    /// Health predicate. Any failure to evaluate it counts as not running.
    async fn is_running(&self, name: &ContainerName) -> bool;

    async fn enter_maintenance(&self, _name: &ContainerName) -> Result<(), HookError> {
        Err(HookError::Undefined(Hook::EnterMaintenance))
    }

    async fn exit_maintenance(&self, _name: &ContainerName) -> Result<(), HookError> {
        Err(HookError::Undefined(Hook::ExitMaintenance))
    }

    async fn backup(&self, _name: &ContainerName) -> Result<(), HookError> {
        Err(HookError::Undefined(Hook::Backup))
    }

    async fn restore(&self, _name: &ContainerName) -> Result<(), HookError> {
        Err(HookError::Undefined(Hook::Restore))
    }

    async fn post_start(&self, _name: &ContainerName) -> Result<(), HookError> {
        Err(HookError::Undefined(Hook::PostStart))
    }

    /// Application version as reported by the application itself.
    async fn get_version(&self, _name: &ContainerName) -> Result<String, HookError> {
        Err(HookError::Undefined(Hook::Version))
    }
}
