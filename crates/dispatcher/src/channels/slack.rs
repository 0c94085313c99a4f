//! SlackChannel - Slack incoming webhook

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::alerter::AlertChannel;
use crate::error::AlertError;

pub struct SlackChannel {
    client: Client,
    webhook: String,
    timeout: Duration,
}

impl SlackChannel {
    pub fn new(client: Client, webhook: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            webhook: webhook.into(),
            timeout,
        }
    }
}

#[async_trait]
impl AlertChannel for SlackChannel {
    fn name(&self) -> &str {
        "slack"
    }

    #[instrument(name = "slack_channel_send", skip(self, text))]
    async fn send(&self, text: &str) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.webhook)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlertError::Status {
                status: status.as_u16(),
            });
        }
        debug!(status = status.as_u16(), "Slack alert delivered");
        Ok(())
    }
}
