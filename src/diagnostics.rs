// ABOUTME: Diagnostics accumulator for non-fatal warnings during an upgrade.
// ABOUTME: Failed steps, notification errors and lock cleanup problems land here.

use serde::Serialize;

/// Collects non-fatal warnings during an upgrade.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected during an upgrade.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A runtime or hook step failed; the sequence carried on.
    pub fn step(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Step,
            message: message.into(),
        }
    }

    /// The application version could not be determined.
    pub fn version(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Version,
            message: message.into(),
        }
    }

    pub fn notification(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Notification,
            message: message.into(),
        }
    }

    pub fn lock_release(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::LockRelease,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A forward or rollback step failed.
    Step,
    /// Version query failed and no fallback was available.
    Version,
    /// The notifier could not deliver.
    Notification,
    /// Failed to remove the upgrade lock (lock file may remain).
    LockRelease,
}
