use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info};

use crate::digest::DigestResult;
use common::{NotifyMethod, Settings};

pub mod email;
pub mod html;
pub mod webhook;

pub use email::EmailNotifier;
pub use webhook::WebhookNotifier;

/// Errors from a single delivery attempt. Delivery is never retried;
/// failures are recorded by the orchestrator.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("delivery API error {status}: {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },
}

/// A delivery channel for generated digests.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Stable channel name used in logs and run summaries.
    fn name(&self) -> &'static str;

    /// Deliver the digest over this channel. One attempt, no retry.
    async fn send(&self, digest: &DigestResult) -> Result<(), NotificationError>;
}

/// Per-channel result collected for the run summary.
#[derive(Debug)]
pub struct NotificationOutcome {
    pub channel: &'static str,
    pub result: Result<(), NotificationError>,
}

impl NotificationOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Map the configured methods onto notifier instances, in declared order.
/// Unknown method names were already rejected while resolving `Settings`.
pub fn build_notifiers(settings: &Settings) -> Vec<Box<dyn Notifier>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();
    for method in &settings.methods {
        match method {
            NotifyMethod::Email => {
                if let Some(email) = &settings.email {
                    notifiers.push(Box::new(EmailNotifier::new(email.clone())));
                }
            }
            NotifyMethod::Webhook => {
                if let Some(webhook) = &settings.webhook {
                    notifiers.push(Box::new(WebhookNotifier::new(webhook.clone())));
                }
            }
        }
    }
    notifiers
}

/// Send the digest over every channel, in order. A channel failure is
/// logged and recorded but never prevents the remaining channels from
/// being attempted.
pub async fn dispatch_all(
    notifiers: &[Box<dyn Notifier>],
    digest: &DigestResult,
) -> Vec<NotificationOutcome> {
    let mut outcomes = Vec::with_capacity(notifiers.len());

    for notifier in notifiers {
        let channel = notifier.name();
        info!(channel, "sending notification");

        let result = notifier.send(digest).await;
        match &result {
            Ok(()) => info!(channel, "notification sent"),
            Err(e) => error!(channel, error = %e, "failed to send notification"),
        }

        outcomes.push(NotificationOutcome { channel, result });
    }

    outcomes
}
