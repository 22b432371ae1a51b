// ABOUTME: Email notifier that hands an RFC 5322 message to the local sendmail.
// ABOUTME: Recipients come from a comma-separated list and must not be empty.

use async_trait::async_trait;
use chrono::Utc;
use nonempty::NonEmpty;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Notification, Notifier, NotifyError};

const DEFAULT_SENDER_NAME: &str = "rollover";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub sender_name: String,
    pub sender_address: String,
    pub recipients: NonEmpty<String>,
}

impl EmailSettings {
    /// Settings from command-line values. `None` when no recipient is given.
    pub fn from_args(
        sender_name: Option<&str>,
        sender_address: Option<&str>,
        recipients: Option<&str>,
    ) -> Option<Self> {
        let recipients = parse_recipients(recipients?)?;
        let sender_address = sender_address
            .map(str::to_string)
            .unwrap_or_else(default_sender_address);
        Some(Self {
            sender_name: sender_name.unwrap_or(DEFAULT_SENDER_NAME).to_string(),
            sender_address,
            recipients,
        })
    }
}

fn parse_recipients(list: &str) -> Option<NonEmpty<String>> {
    let recipients = list
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();
    NonEmpty::from_vec(recipients)
}

fn default_sender_address() -> String {
    let host = gethostname::gethostname().to_string_lossy().into_owned();
    format!("{}@{}", DEFAULT_SENDER_NAME, host)
}

pub struct MailNotifier {
    settings: EmailSettings,
    command: Vec<String>,
}

impl MailNotifier {
    pub fn new(settings: EmailSettings) -> Self {
        Self {
            settings,
            command: vec!["sendmail".into(), "-t".into(), "-i".into()],
        }
    }

    /// Deliver through `command` instead of `sendmail -t -i`.
    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    fn render(&self, notification: &Notification) -> String {
        let to: Vec<&str> = self.settings.recipients.iter().map(String::as_str).collect();
        format!(
            "From: \"{}\" <{}>\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
            header_value(&self.settings.sender_name).replace('"', ""),
            header_value(&self.settings.sender_address),
            header_value(&to.join(", ")),
            header_value(&notification.subject),
            Utc::now().to_rfc2822(),
            notification.body.replace('\n', "\r\n"),
        )
    }
}

/// Header values are single-line.
fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(NotifyError::Spawn {
                program: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            });
        };

        let message = self.render(notification);
        tracing::debug!(
            "Sending notification to {} recipient(s)",
            self.settings.recipients.len()
        );

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| NotifyError::Spawn {
                program: program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(message.as_bytes())
                .await
                .map_err(NotifyError::Write)?;
        }

        let output = child.wait_with_output().await.map_err(NotifyError::Write)?;
        if !output.status.success() {
            return Err(NotifyError::Exited {
                program: program.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> EmailSettings {
        EmailSettings::from_args(
            Some("Ops"),
            Some("ops@example.org"),
            Some("a@example.org, b@example.org"),
        )
        .unwrap()
    }

    fn notification() -> Notification {
        Notification {
            subject: "nextcloud upgraded".to_string(),
            body: "from 28.0.1\nto 29.0.4".to_string(),
        }
    }

    #[test]
    fn recipients_are_split_and_trimmed() {
        let s = settings();
        assert_eq!(s.recipients.head, "a@example.org");
        assert_eq!(s.recipients.tail, vec!["b@example.org".to_string()]);
    }

    #[test]
    fn no_recipients_means_no_email() {
        assert!(EmailSettings::from_args(None, None, None).is_none());
        assert!(EmailSettings::from_args(None, None, Some(" , ")).is_none());
    }

    #[test]
    fn sender_defaults_to_tool_name_at_host() {
        let s = EmailSettings::from_args(None, None, Some("root@localhost")).unwrap();
        assert_eq!(s.sender_name, "rollover");
        assert!(s.sender_address.starts_with("rollover@"));
    }

    #[test]
    fn message_has_headers_and_body() {
        let message = MailNotifier::new(settings()).render(&notification());
        assert!(message.starts_with("From: \"Ops\" <ops@example.org>\r\n"));
        assert!(message.contains("To: a@example.org, b@example.org\r\n"));
        assert!(message.contains("Subject: nextcloud upgraded\r\n"));
        assert!(message.contains("Date: "));
        assert!(message.ends_with("\r\n\r\nfrom 28.0.1\r\nto 29.0.4\r\n"));
    }

    #[test]
    fn subject_cannot_inject_headers() {
        let mut n = notification();
        n.subject = "hi\r\nBcc: evil@example.org".to_string();
        let message = MailNotifier::new(settings()).render(&n);
        assert!(!message.contains("\r\nBcc:"));
    }

    #[tokio::test]
    async fn message_is_piped_to_command() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("mail.txt");
        let notifier = MailNotifier::new(settings()).with_command(vec![
            "sh".into(),
            "-c".into(),
            format!("cat > '{}'", out.display()),
        ]);

        notifier.notify(&notification()).await.unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.contains("Subject: nextcloud upgraded"));
    }

    #[tokio::test]
    async fn failing_command_is_an_error() {
        let notifier = MailNotifier::new(settings()).with_command(vec![
            "sh".into(),
            "-c".into(),
            "cat > /dev/null; echo nope >&2; exit 75".into(),
        ]);

        let err = notifier.notify(&notification()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Exited { code: Some(75), ref stderr, .. } if stderr == "nope"));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let notifier = MailNotifier::new(settings())
            .with_command(vec!["/nonexistent/sendmail".into(), "-t".into()]);
        assert!(matches!(
            notifier.notify(&notification()).await,
            Err(NotifyError::Spawn { .. })
        ));
    }
}
