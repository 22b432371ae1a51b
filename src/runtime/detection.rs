// ABOUTME: Container runtime detection on the local host.
// ABOUTME: Honors explicit overrides, then checks Podman sockets before Docker.

use super::types::{RuntimeConfig, RuntimeInfo, RuntimeType};
use std::path::Path;

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked {})", checked.join(", "))]
    NoRuntimeFound { checked: Vec<String> },
}

/// Detect the container runtime on this host.
///
/// Detection order (when not explicitly configured):
/// 1. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 2. Rootful Podman socket (`/run/podman/podman.sock`)
/// 3. Docker socket (`/var/run/docker.sock`)
pub fn detect_local(config: Option<&RuntimeConfig>) -> Result<RuntimeInfo, DetectionError> {
    detect_with(config, current_uid().as_deref(), |p| Path::new(p).exists())
}

fn detect_with(
    config: Option<&RuntimeConfig>,
    uid: Option<&str>,
    exists: impl Fn(&str) -> bool,
) -> Result<RuntimeInfo, DetectionError> {
    if let Some(cfg) = config
        && let Some(runtime_type) = cfg.runtime
    {
        let socket_path = cfg
            .socket
            .clone()
            .unwrap_or_else(|| default_socket_path(runtime_type).to_string());
        return Ok(RuntimeInfo {
            runtime_type,
            socket_path,
        });
    }

    let mut candidates = Vec::with_capacity(3);
    if let Some(uid) = uid {
        candidates.push((
            RuntimeType::Podman,
            format!("/run/user/{}/podman/podman.sock", uid),
        ));
    }
    candidates.push((RuntimeType::Podman, ROOTFUL_PODMAN.to_string()));
    candidates.push((RuntimeType::Docker, DOCKER_SOCKET.to_string()));

    // A socket path without a runtime type still has to be tried.
    if let Some(socket) = config.and_then(|c| c.socket.as_ref()) {
        let runtime_type = if socket.contains("podman") {
            RuntimeType::Podman
        } else {
            RuntimeType::Docker
        };
        candidates.insert(0, (runtime_type, socket.clone()));
    }

    for (runtime_type, socket_path) in &candidates {
        if exists(socket_path) {
            tracing::debug!("Found {} socket at {}", runtime_type, socket_path);
            return Ok(RuntimeInfo {
                runtime_type: *runtime_type,
                socket_path: socket_path.clone(),
            });
        }
    }

    Err(DetectionError::NoRuntimeFound {
        checked: candidates.into_iter().map(|(_, path)| path).collect(),
    })
}

fn current_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}

fn default_socket_path(runtime: RuntimeType) -> &'static str {
    match runtime {
        RuntimeType::Docker => DOCKER_SOCKET,
        RuntimeType::Podman => ROOTFUL_PODMAN,
    }
}
