use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{NotificationError, Notifier};
use crate::digest::DigestResult;
use common::{mask_url, WebhookSettings};

/// Value of the `source` field in every payload.
const PAYLOAD_SOURCE: &str = "AI News Bot";

/// Per-delivery request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Webhook delivery: one JSON POST to the configured URL.
pub struct WebhookNotifier {
    settings: WebhookSettings,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(settings: WebhookSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, digest: &DigestResult) -> Result<(), NotificationError> {
        let payload = WebhookPayload {
            title: digest.title(),
            content: &digest.text,
            timestamp: digest
                .generated_at
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string(),
            source: PAYLOAD_SOURCE,
        };

        info!(url = %mask_url(&self.settings.url), "sending webhook");

        let response = self
            .client
            .post(&self.settings.url)
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(status = %status, "webhook accepted");
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(NotificationError::Api { status, message })
        }
    }
}

// Webhook payload schema
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    title: String,
    content: &'a str,
    timestamp: String,
    source: &'static str,
}
