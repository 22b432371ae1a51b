// ABOUTME: Drives one upgrade attempt end to end through the typed states.
// ABOUTME: Version check, swap, health poll, then finalize or roll back.

use crate::adapter::{ApplicationAdapter, CapabilityError};
use crate::diagnostics::Diagnostics;
use crate::notify::Notifier;
use crate::runtime::{ContainerOps, ImageOps, RuntimeGateway};

use super::outcome::UpgradeOutcome;
use super::poller::HealthPoller;
use super::state::Validated;
use super::transitions::VersionCheck;
use super::{Upgrade, UpgradeError, UpgradeRequest};

/// Outcome of a run plus the warnings collected on the way.
#[derive(Debug)]
pub struct UpgradeReport {
    pub outcome: UpgradeOutcome,
    pub diagnostics: Diagnostics,
}

pub struct UpgradeController<'a, R, A: ?Sized, N: ?Sized> {
    upgrade: Upgrade<'a, A, Validated>,
    gateway: RuntimeGateway<'a, R>,
    notifier: &'a N,
}

impl<'a, R, A, N> UpgradeController<'a, R, A, N>
where
    R: ImageOps + ContainerOps,
    A: ApplicationAdapter + ?Sized,
    N: Notifier + ?Sized,
{
    /// Validate the adapter. No runtime call is made here.
    pub fn new(
        request: &'a UpgradeRequest,
        gateway: RuntimeGateway<'a, R>,
        adapter: &'a A,
        notifier: &'a N,
    ) -> Result<Self, CapabilityError> {
        Ok(Self {
            upgrade: Upgrade::new(request, adapter)?,
            gateway,
            notifier,
        })
    }

    /// Run the attempt.
    ///
    /// # Errors
    ///
    /// Only failures before the first mutation are errors; everything after
    /// ends in an [`UpgradeOutcome`].
    pub async fn run(self) -> Result<UpgradeReport, UpgradeError> {
        let mut diagnostics = Diagnostics::default();
        let request = self.upgrade.request();
        let poller = HealthPoller::new(request.poll_interval(), request.check_timeout());

        if let Err(e) = self.upgrade.adapter.preflight(request.container()) {
            return Ok(UpgradeReport {
                outcome: UpgradeOutcome::ConfigurationError {
                    reason: e.to_string(),
                },
                diagnostics,
            });
        }

        let outdated = match self
            .upgrade
            .check_version(&self.gateway, &mut diagnostics)
            .await?
        {
            VersionCheck::UpToDate { image } => {
                return Ok(UpgradeReport {
                    outcome: UpgradeOutcome::AlreadyLatest {
                        image: image.into_inner(),
                    },
                    diagnostics,
                });
            }
            VersionCheck::Outdated(upgrade) => upgrade,
        };

        let swapped = outdated.swap(&self.gateway, &mut diagnostics).await;

        let outcome = match swapped.wait_healthy(&poller).await {
            Ok(healthy) => {
                healthy
                    .finalize(&self.gateway, self.notifier, &mut diagnostics)
                    .await
            }
            Err((swapped, timeout)) => {
                tracing::warn!("{}", timeout);
                swapped
                    .roll_back(&self.gateway, self.notifier, &mut diagnostics)
                    .await
            }
        };

        Ok(UpgradeReport {
            outcome,
            diagnostics,
        })
    }
}
