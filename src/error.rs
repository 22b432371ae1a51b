// ABOUTME: Application-wide error type for rollover.
// ABOUTME: Failures that end an invocation before any outcome can be reported.

use thiserror::Error;

use crate::runtime::RuntimeError;
use crate::upgrade::UpgradeError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("container runtime unavailable: {0}")]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Upgrade(#[from] UpgradeError),
}

impl Error {
    /// Process exit code. Every pre-flight failure is a plain failure.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

pub type Result<T> = std::result::Result<T, Error>;
