// ABOUTME: The immutable description of one upgrade attempt.
// ABOUTME: Built once from the template and command line, then passed by reference.

use std::time::Duration;

use crate::types::{ContainerName, ImageRef};

#[derive(Debug, Clone)]
pub struct UpgradeRequest {
    template: String,
    container: ContainerName,
    image: ImageRef,
    timeout: u32,
    poll_interval: Duration,
    check_timeout: Duration,
}

impl UpgradeRequest {
    /// `timeout` is the number of health evaluations before giving up.
    pub fn new(
        template: impl Into<String>,
        container: ContainerName,
        image: ImageRef,
        timeout: u32,
    ) -> Self {
        Self {
            template: template.into(),
            container,
            image,
            timeout,
            poll_interval: Duration::from_secs(1),
            check_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Longest a single health evaluation may take before it counts as failed.
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Canonical name of the instance being upgraded.
    pub fn container(&self) -> &ContainerName {
        &self.container
    }

    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    pub fn timeout(&self) -> u32 {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn check_timeout(&self) -> Duration {
        self.check_timeout
    }
}
