// ABOUTME: Upgrade state markers for the type state pattern.
// ABOUTME: Each state carries the data the next transition needs.

use crate::types::{ContainerName, ImageId};

/// Capabilities validated; nothing has touched the runtime yet.
/// Available actions: `check_version()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Validated;

/// What a swap will do, fixed once the version check finds a newer image.
#[derive(Debug, Clone)]
pub struct SwapPlan {
    pub(crate) latest: ImageId,
    pub(crate) instance: ContainerName,
    pub(crate) version_before: String,
}

impl SwapPlan {
    /// Identity of the pulled image.
    pub fn latest(&self) -> &ImageId {
        &self.latest
    }

    /// Name of the new instance while both exist.
    pub fn instance(&self) -> &ContainerName {
        &self.instance
    }

    pub fn version_before(&self) -> &str {
        &self.version_before
    }
}

/// A newer image is available locally.
/// Available actions: `swap()`
#[derive(Debug, Clone)]
pub struct Outdated {
    pub(crate) plan: SwapPlan,
}

/// Old instance stopped, new instance started (or attempted).
/// Available actions: `wait_healthy()`, `roll_back()`
#[derive(Debug, Clone)]
pub struct Swapped {
    pub(crate) plan: SwapPlan,
    pub(crate) maintenance_exited: bool,
}

/// New instance passed its health predicate.
/// Available actions: `finalize()`
#[derive(Debug, Clone)]
pub struct Healthy {
    pub(crate) plan: SwapPlan,
    pub(crate) maintenance_exited: bool,
    pub(crate) attempts: u32,
}
