// ABOUTME: Errors that abort an upgrade before anything was changed.
// ABOUTME: Failures after the swap starts are warnings, not errors.

use crate::runtime::GatewayError;
use crate::types::ContainerNameError;

use super::lock::LockError;

#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    /// Pull or identity lookup failed; no instance was touched.
    #[error("version check failed: {0}")]
    VersionCheck(#[from] GatewayError),

    #[error("cannot name the new instance: {0}")]
    InstanceName(#[from] ContainerNameError),

    #[error(transparent)]
    Lock(#[from] LockError),
}
