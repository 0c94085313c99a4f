//! Alerter - threshold-based failure alerts
//!
//! Each channel is attempted independently; a failing channel is logged and
//! never stops the others.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use contracts::{AlertConfig, FailureKey};
use reqwest::Client;
use tracing::{info, instrument, warn};

use crate::channels::{EmailChannel, Mailer, SendmailMailer, SlackChannel};
use crate::error::AlertError;

/// A single alert destination
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Channel kind (`slack`, `email`, ...)
    fn name(&self) -> &str;

    /// Deliver one alert text
    async fn send(&self, text: &str) -> Result<(), AlertError>;
}

/// Called by the dispatcher after each failure
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    async fn notify(
        &self,
        key: &FailureKey,
        consecutive_failures: i64,
        message: &str,
    ) -> Result<AlertReport, AlertError>;
}

/// What an alert round did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertReport {
    /// Threshold reached and channels attempted
    pub triggered: bool,
    pub delivered: usize,
    pub failed: usize,
}

pub struct Alerter {
    threshold: i64,
    channels: Vec<Box<dyn AlertChannel>>,
}

impl Alerter {
    pub fn new(threshold: i64, channels: Vec<Box<dyn AlertChannel>>) -> Self {
        Self {
            threshold,
            channels,
        }
    }

    /// Slack (if configured) plus one email channel per address
    pub fn from_config(config: &AlertConfig, client: Client, timeout: Duration) -> Self {
        let mut channels: Vec<Box<dyn AlertChannel>> = Vec::new();
        if let Some(webhook) = config.slack_webhook() {
            channels.push(Box::new(SlackChannel::new(client, webhook, timeout)));
        }
        if !config.emails.is_empty() {
            let mailer: Arc<dyn Mailer> = Arc::new(SendmailMailer::from_config(config, timeout));
            for to in &config.emails {
                channels.push(Box::new(EmailChannel::new(mailer.clone(), to)));
            }
        }
        Self::new(config.threshold, channels)
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Whether `consecutive_failures` crosses the threshold
    pub fn should_alert(&self, consecutive_failures: i64) -> bool {
        self.threshold > 0 && consecutive_failures >= self.threshold
    }

    /// Alert text for a key
    pub fn compose(key: &FailureKey, consecutive_failures: i64, message: &str) -> String {
        format!("[revalidation] {key} failed {consecutive_failures} times: {message}")
    }

    /// Send an alert on every channel when the threshold is reached
    #[instrument(
        name = "alerter_maybe_alert",
        skip(self, message),
        fields(key = %key, count = consecutive_failures)
    )]
    pub async fn maybe_alert(
        &self,
        key: &FailureKey,
        consecutive_failures: i64,
        message: &str,
    ) -> AlertReport {
        if !self.should_alert(consecutive_failures) {
            return AlertReport::default();
        }

        let text = Self::compose(key, consecutive_failures, message);
        let mut report = AlertReport {
            triggered: true,
            ..Default::default()
        };

        for channel in &self.channels {
            match channel.send(&text).await {
                Ok(()) => {
                    report.delivered += 1;
                    observability::record_alert(channel.name(), true);
                }
                Err(e) => {
                    report.failed += 1;
                    observability::record_alert(channel.name(), false);
                    warn!(channel = channel.name(), error = %e, "Alert delivery failed");
                }
            }
        }

        info!(
            delivered = report.delivered,
            failed = report.failed,
            "Failure alert sent"
        );
        report
    }
}

#[async_trait]
impl FailureNotifier for Alerter {
    async fn notify(
        &self,
        key: &FailureKey,
        consecutive_failures: i64,
        message: &str,
    ) -> Result<AlertReport, AlertError> {
        Ok(self.maybe_alert(key, consecutive_failures, message).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
    }

    struct RecordingChannel {
        name: &'static str,
        fail: bool,
        recorder: Arc<Recorder>,
    }

    #[async_trait]
    impl AlertChannel for RecordingChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn send(&self, text: &str) -> Result<(), AlertError> {
            self.recorder
                .sent
                .lock()
                .unwrap()
                .push(format!("{}: {}", self.name, text));
            if self.fail {
                return Err(AlertError::Mail("relay refused".into()));
            }
            Ok(())
        }
    }

    fn channel(name: &'static str, fail: bool, recorder: &Arc<Recorder>) -> Box<dyn AlertChannel> {
        Box::new(RecordingChannel {
            name,
            fail,
            recorder: recorder.clone(),
        })
    }

    fn key() -> FailureKey {
        FailureKey::new("default", "content", "all")
    }

    #[tokio::test]
    async fn test_disabled_threshold_is_noop() {
        let recorder = Arc::new(Recorder::default());
        let alerter = Alerter::new(0, vec![channel("slack", false, &recorder)]);

        let report = alerter.maybe_alert(&key(), 10, "HTTP 500").await;
        assert!(!report.triggered);
        assert!(recorder.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_below_threshold_is_noop() {
        let recorder = Arc::new(Recorder::default());
        let alerter = Alerter::new(3, vec![channel("slack", false, &recorder)]);

        assert!(!alerter.maybe_alert(&key(), 2, "HTTP 500").await.triggered);
        assert!(recorder.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_alert_text_and_fanout() {
        let recorder = Arc::new(Recorder::default());
        let alerter = Alerter::new(
            3,
            vec![
                channel("slack", false, &recorder),
                channel("email", false, &recorder),
            ],
        );

        let report = alerter.maybe_alert(&key(), 3, "HTTP 500").await;
        assert_eq!(report.delivered, 2);

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(
            sent[0],
            "slack: [revalidation] default/content/all failed 3 times: HTTP 500"
        );
        assert!(sent[1].starts_with("email: "));
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_block_others() {
        let recorder = Arc::new(Recorder::default());
        let alerter = Alerter::new(
            1,
            vec![
                channel("slack", true, &recorder),
                channel("email", true, &recorder),
                channel("email", false, &recorder),
            ],
        );

        let report = alerter.maybe_alert(&key(), 1, "timeout").await;
        assert_eq!(report.failed, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(recorder.sent.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_from_config_channels() {
        let config = AlertConfig {
            threshold: 3,
            slack_webhook: Some("https://hooks.slack.example/T000".into()),
            emails: vec!["ops@example.com".into(), "dev@example.com".into()],
            ..Default::default()
        };
        let alerter = Alerter::from_config(&config, Client::new(), Duration::from_secs(5));
        assert_eq!(alerter.channel_count(), 3);
        assert_eq!(alerter.threshold(), 3);

        let empty = Alerter::from_config(&AlertConfig::default(), Client::new(), Duration::from_secs(5));
        assert_eq!(empty.channel_count(), 0);
    }
}
