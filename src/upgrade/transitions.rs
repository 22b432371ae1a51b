// ABOUTME: State transition methods for the upgrade workflow.
// ABOUTME: Forward and rollback steps log failures as warnings and keep going.

use std::fmt::Display;

use crate::adapter::ApplicationAdapter;
use crate::diagnostics::{Diagnostics, Warning};
use crate::notify::Notifier;
use crate::runtime::{ContainerOps, ImageOps, RuntimeGateway};
use crate::types::{ContainerName, ImageId};

use super::outcome::UpgradeOutcome;
use super::poller::{HealthPoller, PollTimeout};
use super::state::{Healthy, Outdated, SwapPlan, Swapped, Validated};
use super::{Upgrade, UpgradeError};

/// Result type for transitions that hand back the previous state on failure.
pub type TransitionResult<'a, A, T, S, E> = Result<Upgrade<'a, A, T>, (Upgrade<'a, A, S>, E)>;

/// Result of comparing the running image with the freshly pulled one.
pub enum VersionCheck<'a, A: ?Sized> {
    UpToDate { image: ImageId },
    Outdated(Upgrade<'a, A, Outdated>),
}

/// Record a failed step and report whether it succeeded.
fn step<E: Display>(diag: &mut Diagnostics, what: &str, result: Result<(), E>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            diag.warn(Warning::step(format!("{} failed: {}", what, e)));
            false
        }
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

impl<'a, A: ApplicationAdapter + ?Sized, S> Upgrade<'a, A, S> {
    /// Application version of `name`, falling back to its short container ID.
    async fn query_version<R: ImageOps + ContainerOps>(
        &self,
        gateway: &RuntimeGateway<'_, R>,
        name: &ContainerName,
        diag: &mut Diagnostics,
    ) -> String {
        if self.capabilities.version {
            match self.adapter.get_version(name).await {
                Ok(version) => return version,
                Err(e) => tracing::debug!("Version hook for {} failed: {}", name, e),
            }
        }
        match gateway.short_id(name).await {
            Ok(id) => id,
            Err(e) => {
                diag.warn(Warning::version(format!(
                    "could not determine version of {}: {}",
                    name, e
                )));
                "unknown".to_string()
            }
        }
    }

    async fn notify<N: Notifier + ?Sized>(
        &self,
        notifier: &N,
        outcome: &UpgradeOutcome,
        diag: &mut Diagnostics,
    ) {
        let Some(notification) = outcome.notification(self.request.container()) else {
            return;
        };
        if let Err(e) = notifier.notify(&notification).await {
            diag.warn(Warning::notification(format!(
                "failed to send notification: {}",
                e
            )));
        }
    }
}

// =============================================================================
// Validated -> Outdated
// =============================================================================

impl<'a, A: ApplicationAdapter + ?Sized> Upgrade<'a, A, Validated> {
    /// Pull the target image and compare it with what the container runs.
    ///
    /// # Errors
    ///
    /// Any failure here happens before a mutation and aborts the attempt.
    pub async fn check_version<R: ImageOps + ContainerOps>(
        self,
        gateway: &RuntimeGateway<'_, R>,
        diag: &mut Diagnostics,
    ) -> Result<VersionCheck<'a, A>, UpgradeError> {
        let container = self.request.container();
        let image = self.request.image();

        gateway.pull_image(image).await?;
        let running = gateway.running_image(container).await?;
        let latest = gateway.pulled_image(image).await?;

        if running == latest {
            tracing::info!("{} already runs the latest {}", container, image);
            return Ok(VersionCheck::UpToDate { image: latest });
        }

        tracing::info!(
            "{} runs {}, latest {} is {}",
            container,
            running.short(),
            image,
            latest.short()
        );

        let instance = container.instance_for(&latest)?;
        let version_before = self.query_version(gateway, container, diag).await;
        let plan = SwapPlan {
            instance,
            latest,
            version_before,
        };
        Ok(VersionCheck::Outdated(self.transition(Outdated { plan })))
    }
}

// =============================================================================
// Outdated -> Swapped
// =============================================================================

impl<'a, A: ApplicationAdapter + ?Sized> Upgrade<'a, A, Outdated> {
    /// Replace the running instance with one on the latest image.
    ///
    /// Every step runs at most once; failures become warnings and the health
    /// check decides what happens next.
    pub async fn swap<R: ImageOps + ContainerOps>(
        self,
        gateway: &RuntimeGateway<'_, R>,
        diag: &mut Diagnostics,
    ) -> Upgrade<'a, A, Swapped> {
        let caps = self.capabilities;
        let container = self.request.container();
        let instance = &self.state.plan.instance;

        if caps.maintenance {
            tracing::info!("Entering maintenance mode");
            step(
                diag,
                "entering maintenance mode",
                self.adapter.enter_maintenance(container).await,
            );
        }

        if caps.backup {
            tracing::info!("Backing up {}", container);
            step(diag, "backup", self.adapter.backup(container).await);
        }

        tracing::info!("Stopping {}", container);
        step(
            diag,
            &format!("stopping {}", container),
            gateway.stop_instance(container).await,
        );

        tracing::info!("Starting {} from {}", instance, self.request.image());
        step(
            diag,
            &format!("starting {}", instance),
            self.adapter
                .start_instance(instance, self.request.image())
                .await,
        );

        if caps.post_start {
            tracing::info!("Running post-start hook");
            step(diag, "post-start hook", self.adapter.post_start(instance).await);
        }

        let mut maintenance_exited = false;
        if caps.maintenance {
            tracing::info!("Leaving maintenance mode");
            maintenance_exited = step(
                diag,
                "leaving maintenance mode",
                self.adapter.exit_maintenance(instance).await,
            );
        }

        let plan = self.state.plan.clone();
        self.transition(Swapped {
            plan,
            maintenance_exited,
        })
    }
}

// =============================================================================
// Swapped -> Healthy | Swapped (rollback)
// =============================================================================

impl<'a, A: ApplicationAdapter + ?Sized> Upgrade<'a, A, Swapped> {
    /// Poll the new instance's health predicate up to the request's timeout.
    pub async fn wait_healthy(
        self,
        poller: &HealthPoller,
    ) -> TransitionResult<'a, A, Healthy, Swapped, PollTimeout> {
        let adapter = self.adapter;
        let instance = &self.state.plan.instance;
        tracing::info!(
            "Waiting for {} to become healthy ({} attempts)",
            instance,
            self.request.timeout()
        );

        let result = poller
            .poll(self.request.timeout(), move || adapter.is_running(instance))
            .await;

        match result {
            Ok(attempts) => {
                let Swapped {
                    plan,
                    maintenance_exited,
                } = self.state.clone();
                Ok(self.transition(Healthy {
                    plan,
                    maintenance_exited,
                    attempts,
                }))
            }
            Err(timeout) => Err((self, timeout)),
        }
    }

    /// Put the previous instance back under its canonical name.
    pub async fn roll_back<R: ImageOps + ContainerOps, N: Notifier + ?Sized>(
        self,
        gateway: &RuntimeGateway<'_, R>,
        notifier: &N,
        diag: &mut Diagnostics,
    ) -> UpgradeOutcome {
        let caps = self.capabilities;
        let container = self.request.container();
        let instance = &self.state.plan.instance;
        tracing::warn!("Rolling back {}", container);

        step(
            diag,
            &format!("stopping {}", instance),
            gateway.stop_instance(instance).await,
        );
        step(
            diag,
            &format!("restarting {}", container),
            gateway.start_instance(container).await,
        );
        if caps.backup {
            tracing::info!("Restoring backup");
            step(diag, "restore", self.adapter.restore(container).await);
        }
        if caps.maintenance {
            step(
                diag,
                "leaving maintenance mode",
                self.adapter.exit_maintenance(container).await,
            );
        }
        step(
            diag,
            &format!("removing {}", instance),
            gateway.remove_instance(instance).await,
        );

        let version_after = self.query_version(gateway, container, diag).await;
        let outcome = UpgradeOutcome::RolledBack {
            version_before: self.state.plan.version_before.clone(),
            version_after,
        };
        self.notify(notifier, &outcome, diag).await;
        outcome
    }
}

// =============================================================================
// Healthy -> done
// =============================================================================

impl<'a, A: ApplicationAdapter + ?Sized> Upgrade<'a, A, Healthy> {
    /// Retire the old instance and give the new one the canonical name.
    pub async fn finalize<R: ImageOps + ContainerOps, N: Notifier + ?Sized>(
        self,
        gateway: &RuntimeGateway<'_, R>,
        notifier: &N,
        diag: &mut Diagnostics,
    ) -> UpgradeOutcome {
        let container = self.request.container();
        let instance = &self.state.plan.instance;
        tracing::info!(
            "{} healthy after {} attempt(s), finalizing",
            instance,
            self.state.attempts
        );

        step(
            diag,
            &format!("removing {}", container),
            gateway.remove_instance(container).await,
        );
        step(
            diag,
            &format!("renaming {} to {}", instance, container),
            gateway.rename_instance(instance, container).await,
        );
        if self.capabilities.maintenance && !self.state.maintenance_exited {
            step(
                diag,
                "leaving maintenance mode",
                self.adapter.exit_maintenance(container).await,
            );
        }

        let version_after = self.query_version(gateway, container, diag).await;
        let outcome = UpgradeOutcome::Success {
            version_before: self.state.plan.version_before.clone(),
            version_after,
        };
        self.notify(notifier, &outcome, diag).await;
        outcome
    }
}
