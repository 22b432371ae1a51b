// ABOUTME: Upgrade notifications: a subject and body sent when an upgrade ends.
// ABOUTME: Delivery is best-effort; callers log failures and carry on.

mod mail;

pub use mail::{EmailSettings, MailNotifier};

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to write message: {0}")]
    Write(#[source] std::io::Error),

    #[error("{program} exited with {}: {stderr}", code.map_or("a signal".to_string(), |c| format!("code {}", c)))]
    Exited {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notifier that only writes to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(subject = %notification.subject, "{}", notification.body);
        Ok(())
    }
}

/// Pick the mail notifier when recipients are configured, else log only.
pub fn from_settings(settings: Option<EmailSettings>) -> Box<dyn Notifier> {
    match settings {
        Some(settings) => Box::new(MailNotifier::new(settings)),
        None => Box::new(LogNotifier),
    }
}
