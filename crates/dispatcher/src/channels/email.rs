//! EmailChannel - plain-text alert mail

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use contracts::AlertConfig;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::alerter::AlertChannel;
use crate::error::AlertError;

const SUBJECT: &str = "Revalidation failure alert";
const DEFAULT_SENDMAIL: &str = "/usr/sbin/sendmail";

/// Mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AlertError>;
}

/// Hands messages to a sendmail-compatible binary
#[derive(Debug, Clone)]
pub struct SendmailMailer {
    program: PathBuf,
    from: Option<String>,
    timeout: Duration,
}

impl SendmailMailer {
    pub fn new(program: impl Into<PathBuf>, from: Option<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            from,
            timeout,
        }
    }

    pub fn from_config(config: &AlertConfig, timeout: Duration) -> Self {
        Self::new(
            config
                .sendmail_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SENDMAIL)),
            config.from.clone(),
            timeout,
        )
    }

    fn render(&self, to: &str, subject: &str, body: &str) -> String {
        let mut message = format!("To: {to}\r\n");
        if let Some(from) = &self.from {
            message.push_str(&format!("From: {from}\r\n"));
        }
        message.push_str(&format!("Subject: {subject}\r\n"));
        message.push_str("Content-Type: text/plain; charset=utf-8\r\n\r\n");
        message.push_str(body);
        message.push_str("\r\n");
        message
    }

    async fn deliver(&self, to: &str, message: String) -> Result<(), AlertError> {
        let mut child = Command::new(&self.program)
            .arg("-i")
            .arg("--")
            .arg(to)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(message.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AlertError::Mail(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Mailer for SendmailMailer {
    #[instrument(name = "sendmail_send", skip(self, subject, body))]
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AlertError> {
        if to.contains(['\r', '\n']) || subject.contains(['\r', '\n']) {
            return Err(AlertError::Mail("header contains a line break".into()));
        }
        let message = self.render(to, subject, body);
        tokio::time::timeout(self.timeout, self.deliver(to, message))
            .await
            .map_err(|_| AlertError::Timeout(self.timeout))??;
        debug!("Alert mail handed to sendmail");
        Ok(())
    }
}

/// One recipient
pub struct EmailChannel {
    mailer: Arc<dyn Mailer>,
    to: String,
}

impl EmailChannel {
    pub fn new(mailer: Arc<dyn Mailer>, to: impl Into<String>) -> Self {
        Self {
            mailer,
            to: to.into(),
        }
    }

    pub fn recipient(&self) -> &str {
        &self.to
    }
}

#[async_trait]
impl AlertChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, text: &str) -> Result<(), AlertError> {
        self.mailer
            .send(&self.to, SUBJECT, text)
            .await
            .map_err(|e| AlertError::Mail(format!("to {}: {e}", self.to)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryMailer {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl Mailer for MemoryMailer {
        async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AlertError> {
            self.sent
                .lock()
                .unwrap()
                .push((to.into(), subject.into(), body.into()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_email_channel_uses_recipient() {
        let mailer = Arc::new(MemoryMailer::default());
        let channel = EmailChannel::new(mailer.clone(), "ops@example.com");

        channel.send("[revalidation] x").await.unwrap();
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent[0].0, "ops@example.com");
        assert_eq!(sent[0].1, SUBJECT);
        assert_eq!(sent[0].2, "[revalidation] x");
    }

    #[test]
    fn test_render_headers() {
        let mailer = SendmailMailer::new(
            "/usr/sbin/sendmail",
            Some("revalidator@example.com".into()),
            Duration::from_secs(5),
        );
        let message = mailer.render("ops@example.com", SUBJECT, "body");
        assert!(message.starts_with("To: ops@example.com\r\nFrom: revalidator@example.com\r\n"));
        assert!(message.ends_with("\r\n\r\nbody\r\n"));
    }

    #[tokio::test]
    async fn test_header_injection_rejected() {
        let mailer = SendmailMailer::new("/usr/sbin/sendmail", None, Duration::from_secs(5));
        let err = mailer
            .send("ops@example.com\r\nBcc: x@example.com", SUBJECT, "body")
            .await
            .unwrap_err();
        assert!(matches!(err, AlertError::Mail(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_error() {
        let mailer = SendmailMailer::new("/nonexistent/sendmail", None, Duration::from_secs(5));
        let err = mailer.send("ops@example.com", SUBJECT, "body").await.unwrap_err();
        assert!(matches!(err, AlertError::Io(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sendmail_script() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.eml");
        let script = dir.path().join("sendmail");
        std::fs::write(
            &script,
            format!("#!/bin/sh\ncat > '{}'\n", out.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mailer = SendmailMailer::new(&script, None, Duration::from_secs(5));
        mailer
            .send("ops@example.com", SUBJECT, "[revalidation] down")
            .await
            .unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.contains("To: ops@example.com"));
        assert!(written.contains("[revalidation] down"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sendmail_failure_status() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("sendmail");
        std::fs::write(&script, "#!/bin/sh\ncat > /dev/null\necho 'relay denied' >&2\nexit 75\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mailer = SendmailMailer::new(&script, None, Duration::from_secs(5));
        let err = mailer.send("ops@example.com", SUBJECT, "x").await.unwrap_err();
        assert!(err.to_string().contains("relay denied"));
    }
}
