// ABOUTME: Validated container names and upgrade instance naming.
// ABOUTME: Follows the Docker/Podman name grammar [a-zA-Z0-9][a-zA-Z0-9_.-]*.

use super::ImageId;
use serde::{Deserialize, Deserializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainerNameError {
    #[error("container name cannot be empty")]
    Empty,

    #[error("container name exceeds maximum length of 253 characters")]
    TooLong,

    #[error("container name must start with a letter or digit")]
    InvalidStart,

    #[error("invalid character in container name: '{0}'")]
    InvalidChar(char),
}

/// Longest name the runtimes accept.
const MAX_LEN: usize = 253;

/// The name a container runtime addresses an instance by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerName(String);

impl ContainerName {
    pub fn new(value: &str) -> Result<Self, ContainerNameError> {
        // Runtimes report names with a leading slash.
        let value = value.strip_prefix('/').unwrap_or(value);

        let mut chars = value.chars();
        let first = chars.next().ok_or(ContainerNameError::Empty)?;

        if value.len() > MAX_LEN {
            return Err(ContainerNameError::TooLong);
        }

        if !first.is_ascii_alphanumeric() {
            return Err(ContainerNameError::InvalidStart);
        }

        if let Some(c) = chars.find(|c| !is_name_char(*c)) {
            return Err(ContainerNameError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the instance that runs `image` alongside this one during an upgrade.
    ///
    /// The result is `<name>-<image>` with characters the runtime rejects
    /// (the `:` of `sha256:...`) replaced by `-`. It is always longer than
    /// `self`, so it never collides with the canonical instance. The image
    /// part is cut short to stay within the runtime's name length limit.
    pub fn instance_for(&self, image: &ImageId) -> Result<ContainerName, ContainerNameError> {
        let room = MAX_LEN
            .checked_sub(self.0.len() + 1)
            .ok_or(ContainerNameError::TooLong)?;
        let suffix: String = image
            .as_str()
            .chars()
            .map(|c| if is_name_char(c) { c } else { '-' })
            .take(room)
            .collect();
        ContainerName::new(&format!("{}-{}", self.0, suffix))
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ContainerName {
    type Err = ContainerNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for ContainerName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}
