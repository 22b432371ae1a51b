// ABOUTME: Image operations trait for container runtimes.
// ABOUTME: Pull images and resolve a reference to its local content identity.

use super::sealed::Sealed;
use crate::types::{ImageId, ImageRef};
use async_trait::async_trait;

/// Image operations: pull and inspect.
#[async_trait]
pub trait ImageOps: Sealed + Send + Sync {
    /// Pull an image from its registry.
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError>;

    /// Content identity of the local image `reference` currently resolves to.
    async fn inspect_image(&self, reference: &ImageRef) -> Result<ImageId, ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("pull failed: {0}")]
    PullFailed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
