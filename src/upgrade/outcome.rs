// ABOUTME: Terminal results of an upgrade invocation and their exit codes.
// ABOUTME: Also renders the notification sent for success and rollback.

use serde::Serialize;

use crate::notify::Notification;
use crate::types::ContainerName;

/// Exit code for an unknown template (`EX_USAGE`).
pub const EXIT_TEMPLATE_NOT_FOUND: u8 = 64;
/// Exit code for a template with missing or unpaired hooks (`EX_DATAERR`).
pub const EXIT_CONFIGURATION: u8 = 65;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpgradeOutcome {
    /// Running image already matches the latest pull.
    AlreadyLatest { image: String },
    Success {
        version_before: String,
        version_after: String,
    },
    /// Health never passed; the previous instance is back.
    RolledBack {
        version_before: String,
        version_after: String,
    },
    ConfigurationError { reason: String },
    TemplateNotFound { template: String },
}

impl UpgradeOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            UpgradeOutcome::AlreadyLatest { .. } | UpgradeOutcome::Success { .. } => 0,
            UpgradeOutcome::RolledBack { .. } => 1,
            UpgradeOutcome::ConfigurationError { .. } => EXIT_CONFIGURATION,
            UpgradeOutcome::TemplateNotFound { .. } => EXIT_TEMPLATE_NOT_FOUND,
        }
    }

    /// Message for the notifier. Only swaps are worth telling anyone about.
    pub fn notification(&self, container: &ContainerName) -> Option<Notification> {
        match self {
            UpgradeOutcome::Success {
                version_before,
                version_after,
            } => Some(Notification {
                subject: format!("{} upgraded to {}", container, version_after),
                body: format!(
                    "The container {} was upgraded from version {} to version {}.",
                    container, version_before, version_after
                ),
            }),
            UpgradeOutcome::RolledBack {
                version_before,
                version_after,
            } => Some(Notification {
                subject: format!("{} upgrade failed, rolled back", container),
                body: format!(
                    "The upgrade of container {} from version {} did not pass its health check \
                     and was rolled back. Running version: {}.",
                    container, version_before, version_after
                ),
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for UpgradeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpgradeOutcome::AlreadyLatest { image } => {
                write!(f, "Already running the latest image ({})", image)
            }
            UpgradeOutcome::Success {
                version_before,
                version_after,
            } => write!(f, "Upgraded from {} to {}", version_before, version_after),
            UpgradeOutcome::RolledBack { version_after, .. } => {
                write!(f, "Upgrade failed; rolled back to {}", version_after)
            }
            UpgradeOutcome::ConfigurationError { reason } => {
                write!(f, "Configuration error: {}", reason)
            }
            UpgradeOutcome::TemplateNotFound { template } => {
                write!(f, "Template not found: {}", template)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        let versions = |before: &str, after: &str| (before.to_string(), after.to_string());

        let (version_before, version_after) = versions("28.0.1", "29.0.4");
        let success = UpgradeOutcome::Success {
            version_before,
            version_after,
        };
        let (version_before, version_after) = versions("28.0.1", "28.0.1");
        let rolled_back = UpgradeOutcome::RolledBack {
            version_before,
            version_after,
        };

        let no_op = UpgradeOutcome::AlreadyLatest {
            image: "sha256:a".into(),
        };
        assert_eq!(no_op.exit_code(), 0);
        assert_eq!(success.exit_code(), 0);
        assert_eq!(rolled_back.exit_code(), 1);
        assert_eq!(
            UpgradeOutcome::ConfigurationError { reason: "x".into() }.exit_code(),
            65
        );
        assert_eq!(
            UpgradeOutcome::TemplateNotFound {
                template: "x".into()
            }
            .exit_code(),
            64
        );
    }

    #[test]
    fn rollback_notification_names_restored_version() {
        let container = ContainerName::new("nextcloud").unwrap();
        let n = UpgradeOutcome::RolledBack {
            version_before: "28.0.1".into(),
            version_after: "28.0.1".into(),
        }
        .notification(&container)
        .unwrap();
        assert!(n.subject.contains("rolled back"));
        assert!(n.body.contains("Running version: 28.0.1"));
    }

    #[test]
    fn no_notification_for_no_op() {
        let container = ContainerName::new("nextcloud").unwrap();
        let outcome = UpgradeOutcome::AlreadyLatest {
            image: "sha256:a".into(),
        };
        assert!(outcome.notification(&container).is_none());
    }

    #[test]
    fn serializes_with_outcome_tag() {
        let json = serde_json::to_value(UpgradeOutcome::Success {
            version_before: "1".into(),
            version_after: "2".into(),
        })
        .unwrap();
        assert_eq!(json["outcome"], "success");
        assert_eq!(json["version_after"], "2");
    }
}
