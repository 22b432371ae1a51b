// ABOUTME: Generic upgrade attempt parameterized by state marker.
// ABOUTME: Construction validates adapter capabilities before any runtime call.

use crate::adapter::{AdapterCapabilities, ApplicationAdapter, CapabilityError};

use super::UpgradeRequest;
use super::state::{Healthy, Outdated, SwapPlan, Swapped, Validated};

/// One upgrade attempt, parameterized by its current state.
pub struct Upgrade<'a, A: ?Sized, S> {
    pub(crate) request: &'a UpgradeRequest,
    pub(crate) adapter: &'a A,
    pub(crate) capabilities: AdapterCapabilities,
    pub(crate) state: S,
}

impl<'a, A: ApplicationAdapter + ?Sized> Upgrade<'a, A, Validated> {
    /// Validate the adapter's hooks and start an attempt.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityError` when a mandatory hook is missing or an
    /// optional hook lacks its pair.
    pub fn new(request: &'a UpgradeRequest, adapter: &'a A) -> Result<Self, CapabilityError> {
        let capabilities = AdapterCapabilities::detect(adapter.hook_slots())?;
        tracing::debug!(?capabilities, "Adapter capabilities");
        Ok(Self {
            request,
            adapter,
            capabilities,
            state: Validated,
        })
    }
}

impl<'a, A: ?Sized, S> Upgrade<'a, A, S> {
    pub fn request(&self) -> &'a UpgradeRequest {
        self.request
    }

    pub fn capabilities(&self) -> AdapterCapabilities {
        self.capabilities
    }

    pub(crate) fn transition<T>(self, state: T) -> Upgrade<'a, A, T> {
        Upgrade {
            request: self.request,
            adapter: self.adapter,
            capabilities: self.capabilities,
            state,
        }
    }
}

impl<A: ?Sized> Upgrade<'_, A, Outdated> {
    pub fn plan(&self) -> &SwapPlan {
        &self.state.plan
    }
}

impl<A: ?Sized> Upgrade<'_, A, Swapped> {
    pub fn plan(&self) -> &SwapPlan {
        &self.state.plan
    }
}

impl<A: ?Sized> Upgrade<'_, A, Healthy> {
    pub fn plan(&self) -> &SwapPlan {
        &self.state.plan
    }

    /// Health evaluations it took to pass.
    pub fn attempts(&self) -> u32 {
        self.state.attempts
    }
}
