// ABOUTME: Container runtime access for Docker and Podman.
// ABOUTME: Detection, the bollard-backed runtime, capability traits, and the gateway.

mod bollard;
mod detection;
mod error;
#[cfg(test)]
pub(crate) mod fake;
mod gateway;
pub mod traits;
mod types;

pub use self::bollard::BollardRuntime;
pub use detection::{DetectionError, detect_local};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use gateway::{GatewayError, RuntimeGateway};
pub use traits::*;
pub use types::{RuntimeConfig, RuntimeInfo, RuntimeType};

/// Detect the local runtime and connect to it.
pub fn connect_local(config: Option<&RuntimeConfig>) -> Result<BollardRuntime, RuntimeError> {
    let info = detect_local(config)?;
    tracing::info!("Using {} at {}", info.runtime_type, info.socket_path);
    BollardRuntime::connect(&info)
}
