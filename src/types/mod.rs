// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Container names, image references, and phantom-typed runtime IDs.

mod container_name;
mod id;
mod image_ref;

pub use container_name::{ContainerName, ContainerNameError};
pub use id::{ContainerId, Id, ImageId};
pub use image_ref::{ImageRef, ParseImageRefError};
