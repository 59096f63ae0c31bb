// src/gmail_client.rs
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::workflow::Notifier;

/// Emails the configured recipient when a task finishes.
#[derive(Debug, Clone)]
pub struct GmailClient {
    client: Client,
    token: String,
    recipient: String,
}

impl GmailClient {
    pub fn new(token: String, recipient: String) -> Self {
        Self {
            client: Client::new(),
            token,
            recipient,
        }
    }
}

#[async_trait]
impl Notifier for GmailClient {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), String> {
        // Gmail takes the whole RFC 2822 message, base64url-encoded.
        let message = format!(
            "To: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}",
            self.recipient, subject, body
        );
        let raw = URL_SAFE.encode(message.as_bytes());

        let response = self
            .client
            .post("https://gmail.googleapis.com/gmail/v1/users/me/messages/send")
            .bearer_auth(&self.token)
            .timeout(Duration::from_secs(30))
            .json(&json!({ "raw": raw }))
            .send()
            .await
            .map_err(|e| format!("Gmail API request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Gmail API error ({}): {}", status, body));
        }

        tracing::debug!("Sent completion notification to {}", self.recipient);
        Ok(())
    }
}
