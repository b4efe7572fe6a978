//! Operator escalation delivery.

use async_trait::async_trait;
use marionette_core::config::NotifyConfig;
use marionette_core::types::{HealthState, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::NotifyError;

/// What the operator channel receives when the target goes Failed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EscalationPayload {
    pub message: String,
    pub state: HealthState,
    /// Re-authentication artifact, when the target is showing a login
    /// prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    pub timestamp: Timestamp,
}

/// Delivery channel for escalations.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, payload: &EscalationPayload) -> Result<(), NotifyError>;
}

/// Escalation sink of last resort: the log.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, payload: &EscalationPayload) -> Result<(), NotifyError> {
        error!(
            message = %payload.message,
            artifact = payload.artifact_url.as_deref().unwrap_or(""),
            "OPERATOR ESCALATION"
        );
        Ok(())
    }
}

/// Posts the payload to a chat-ops webhook as JSON.
///
/// Falls back to [`LogNotifier`] behavior when no URL is configured, so
/// an escalation is never silently dropped.
pub struct WebhookNotifier {
    url: Option<String>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(config: &NotifyConfig) -> Self {
        let url = if config.webhook_url.is_empty() {
            None
        } else {
            Some(config.webhook_url.clone())
        };
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, payload: &EscalationPayload) -> Result<(), NotifyError> {
        let Some(url) = &self.url else {
            return LogNotifier.notify(payload).await;
        };
        let response = self.client.post(url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Delivery(format!(
                "webhook returned {}",
                response.status()
            )));
        }
        info!("Escalation delivered to webhook");
        Ok(())
    }
}
