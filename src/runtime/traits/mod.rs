// ABOUTME: Composable capability traits for container runtimes.
// ABOUTME: Defines ImageOps, ContainerOps, and ExecOps over named instances.

mod container;
mod exec;
mod image;
pub(crate) mod sealed;
mod shared_types;

pub use container::{ContainerError, ContainerOps};
pub use exec::{ExecError, ExecOps};
pub use image::{ImageError, ImageOps};
pub use shared_types::*;

