use serde::Serialize;
use tracing::{debug, info};

use super::{html, NotificationError, Notifier};
use crate::digest::DigestResult;
use common::EmailSettings;

/// Email delivery through the Resend HTTP API. The digest is submitted as
/// both styled HTML and the plain text fallback in a single call.
pub struct EmailNotifier {
    settings: EmailSettings,
    client: reqwest::Client,
}

impl EmailNotifier {
    pub fn new(settings: EmailSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, digest: &DigestResult) -> Result<(), NotificationError> {
        let subject = digest.title();
        let body = EmailRequest {
            from: &self.settings.from,
            to: &self.settings.to,
            subject: &subject,
            html: html::render_email(&subject, &digest.text),
            text: &digest.text,
        };

        info!(to = %self.settings.to, subject = %subject, "sending email");

        let response = self
            .client
            .post(&self.settings.api_url)
            .header(
                "Authorization",
                format!("Bearer {}", self.settings.api_key),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(status = %status, "email accepted by delivery API");
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(NotificationError::Api { status, message })
        }
    }
}

// Resend API request body
#[derive(Debug, Serialize)]
struct EmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: String,
    text: &'a str,
}
