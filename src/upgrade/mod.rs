// ABOUTME: Upgrade orchestration using the type state pattern.
// ABOUTME: Exports the request, state markers, controller, lock and outcome types.

mod attempt;
mod controller;
mod error;
mod lock;
mod outcome;
mod poller;
mod request;
mod state;
mod transitions;

pub use attempt::Upgrade;
pub use controller::{UpgradeController, UpgradeReport};
pub use error::UpgradeError;
pub use lock::{LockError, LockInfo, UpgradeLock, default_state_dir};
pub use outcome::{EXIT_CONFIGURATION, EXIT_TEMPLATE_NOT_FOUND, UpgradeOutcome};
pub use poller::{HealthPoller, PollTimeout};
pub use request::UpgradeRequest;
pub use state::{Healthy, Outdated, SwapPlan, Swapped, Validated};
pub use transitions::{TransitionResult, VersionCheck};
