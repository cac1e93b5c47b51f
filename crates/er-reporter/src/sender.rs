//! Webhook delivery engine.
//!
//! HTTP POST of the report payload with per-attempt timeout, a fixed-delay
//! retry policy, an optional shared-secret header, and structured
//! success/failure logging. The public `send` never returns an error: a
//! broken webhook must not become a second failure for the host.

use crate::error::SendError;
use async_trait::async_trait;
use er_common::{DeliveryJob, DeliverySettings, ReportPayload};
use er_queue::{DeliveryHandler, HandlerError};
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared-secret header for webhook authentication.
pub const SECRET_HEADER: &str = "X-Laravel-Secret";

/// Response body longer than this is truncated in log records.
const LOGGED_BODY_LIMIT: usize = 512;

/// Final 2xx response of a successful send.
#[derive(Debug)]
pub struct SendSuccess {
    pub status: u16,
    pub body: String,
}

/// HTTP webhook sender.
///
/// The client is built once without a default timeout; each request applies
/// the timeout from the [`DeliverySettings`] it is sent with, so deferred
/// jobs honor the settings snapshot they were created under.
pub struct WebhookSender {
    client: Client,
}

impl WebhookSender {
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");
        Self { client }
    }

    /// One full delivery: up to `1 + retry_times` attempts with a fixed
    /// delay between them. An attempt fails on transport error or any
    /// non-2xx response; the last attempt's error is returned.
    pub async fn try_send(
        &self,
        payload: &ReportPayload,
        settings: &DeliverySettings,
    ) -> Result<SendSuccess, SendError> {
        if settings.webhook_url.is_empty() {
            return Err(SendError::MissingWebhookUrl);
        }

        let max_attempts = settings.retry_times.saturating_add(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.send_once(payload, settings).await {
                Ok(success) => return Ok(success),
                Err(e) => {
                    if attempt >= max_attempts {
                        return Err(e);
                    }
                    debug!(
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = settings.retry_delay.as_millis() as u64,
                        error = %e,
                        "Webhook attempt failed, retrying"
                    );
                    tokio::time::sleep(settings.retry_delay).await;
                }
            }
        }
    }

    /// Fire-and-forget send: every outcome terminates in a log record.
    pub async fn send(&self, payload: &ReportPayload, settings: &DeliverySettings) {
        match self.try_send(payload, settings).await {
            Ok(success) => {
                info!(
                    hash = payload.fingerprint_tag().unwrap_or("unknown"),
                    status = success.status,
                    response = %truncate_for_log(&success.body),
                    "Error reported successfully"
                );
            }
            Err(SendError::MissingWebhookUrl) => {
                warn!("Error Reporter: Webhook URL is not configured");
            }
            Err(SendError::Status { status, body }) => {
                error!(
                    status = status,
                    body = %truncate_for_log(&body),
                    "Failed to report error"
                );
            }
            Err(SendError::Transport(e)) => {
                error!(error = %e, "Error Reporter transport failure");
            }
        }
    }

    async fn send_once(
        &self,
        payload: &ReportPayload,
        settings: &DeliverySettings,
    ) -> Result<SendSuccess, SendError> {
        let mut request = self
            .client
            .post(&settings.webhook_url)
            .timeout(settings.timeout)
            .json(payload);

        if let Some(secret) = &settings.secret_key {
            request = request.header(SECRET_HEADER, secret);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            Ok(SendSuccess {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(SendError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

impl Default for WebhookSender {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapter running deferred jobs through the sender.
///
/// Uses `try_send` so the queue sees real failures and can apply the job's
/// own retry schedule on top of the HTTP-level retries.
pub struct WebhookDeliveryHandler {
    sender: Arc<WebhookSender>,
}

impl WebhookDeliveryHandler {
    pub fn new(sender: Arc<WebhookSender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl DeliveryHandler for WebhookDeliveryHandler {
    async fn deliver(&self, job: &DeliveryJob) -> Result<(), HandlerError> {
        self.sender
            .try_send(&job.payload, &job.settings)
            .await
            .map(|_| ())
            .map_err(|e| HandlerError::new(e.to_string()))
    }
}

fn truncate_for_log(body: &str) -> &str {
    match body.char_indices().nth(LOGGED_BODY_LIMIT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_for_log_caps_length() {
        let long = "x".repeat(2000);
        assert_eq!(truncate_for_log(&long).len(), LOGGED_BODY_LIMIT);
        assert_eq!(truncate_for_log("short"), "short");
    }
}
