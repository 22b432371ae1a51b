// ABOUTME: The `run` section of a template: how a new instance is created.
// ABOUTME: Parses port, volume and restart specs into runtime container config.

use serde::Deserialize;
use serde::de::{self, Deserializer};
use std::collections::HashMap;
use std::time::Duration;

use super::TemplateError;
use super::env_value::{EnvValue, resolve_env_map};
use crate::runtime::{ContainerConfig, PortMapping, Protocol, RestartPolicyConfig, VolumeMount};
use crate::types::{ContainerName, ImageRef};

/// Label stamped on every instance this tool creates.
pub const MANAGED_LABEL: &str = "rollover.managed";

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub ports: Vec<String>,

    #[serde(default)]
    pub volumes: Vec<String>,

    #[serde(default)]
    pub env: HashMap<String, EnvValue>,

    #[serde(default)]
    pub labels: HashMap<String, String>,

    #[serde(default)]
    pub command: Option<Vec<String>>,

    #[serde(default, deserialize_with = "deserialize_restart")]
    pub restart: RestartPolicyConfig,

    #[serde(default)]
    pub network: Option<String>,

    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(30)
}

impl RunConfig {
    /// Container configuration for an instance named `name` running `image`.
    pub fn container_config(
        &self,
        name: &ContainerName,
        image: &ImageRef,
    ) -> Result<ContainerConfig, TemplateError> {
        let ports = self
            .ports
            .iter()
            .map(|spec| {
                parse_port_mapping(spec).ok_or_else(|| TemplateError::InvalidPort(spec.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let volumes = self
            .volumes
            .iter()
            .map(|spec| {
                parse_volume_mount(spec).ok_or_else(|| TemplateError::InvalidVolume(spec.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut labels = self.labels.clone();
        labels.insert(MANAGED_LABEL.to_string(), "true".to_string());

        Ok(ContainerConfig {
            name: name.clone(),
            image: image.clone(),
            env: resolve_env_map(&self.env)?,
            labels,
            ports,
            volumes,
            command: self.command.clone(),
            restart_policy: self.restart.clone(),
            stop_timeout: Some(self.stop_timeout),
            network: self.network.clone(),
        })
    }
}

/// Parse a restart policy: `no`, `always`, `unless-stopped`, `on-failure[:N]`.
fn parse_restart_policy(s: &str) -> Result<RestartPolicyConfig, String> {
    match s {
        "no" => Ok(RestartPolicyConfig::No),
        "always" => Ok(RestartPolicyConfig::Always),
        "unless-stopped" => Ok(RestartPolicyConfig::UnlessStopped),
        "on-failure" => Ok(RestartPolicyConfig::OnFailure { max_retries: None }),
        s => match s.strip_prefix("on-failure:") {
            Some(retries) => retries
                .parse::<u32>()
                .map(|n| RestartPolicyConfig::OnFailure {
                    max_retries: Some(n),
                })
                .map_err(|_| format!("invalid max retries: {}", retries)),
            None => Err(format!("unknown restart policy: {}", s)),
        },
    }
}

fn deserialize_restart<'de, D>(deserializer: D) -> Result<RestartPolicyConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_restart_policy(&s).map_err(de::Error::custom)
}

/// Parse a volume mount string like "source:target" or "source:target:ro".
fn parse_volume_mount(spec: &str) -> Option<VolumeMount> {
    let mut parts = spec.split(':');
    let source = parts.next().filter(|s| !s.is_empty())?;
    let target = parts.next().filter(|s| !s.is_empty())?;
    let read_only = match parts.next() {
        None | Some("rw") => false,
        Some("ro") => true,
        Some(_) => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(VolumeMount {
        source: source.to_string(),
        target: target.to_string(),
        read_only,
    })
}

/// Parse a port mapping like "80", "8080:80", "127.0.0.1:8080:80" with optional "/udp".
fn parse_port_mapping(spec: &str) -> Option<PortMapping> {
    let (ports, protocol) = match spec.split_once('/') {
        Some((ports, "tcp")) => (ports, Protocol::Tcp),
        Some((ports, "udp")) => (ports, Protocol::Udp),
        Some(_) => return None,
        None => (spec, Protocol::Tcp),
    };

    let parts: Vec<&str> = ports.split(':').collect();
    let (host_ip, host_port, container_port) = match parts.as_slice() {
        [container] => (None, None, container.parse().ok()?),
        [host, container] => (None, Some(host.parse().ok()?), container.parse().ok()?),
        [ip, host, container] => (
            Some(ip.to_string()),
            Some(host.parse().ok()?),
            container.parse().ok()?,
        ),
        _ => return None,
    };

    Some(PortMapping {
        host_port,
        container_port,
        protocol,
        host_ip,
    })
}
