// Outgoing email
//
// `SendGridProvider` talks to the SendGrid v3 API; `ConsoleProvider` only
// logs, and is used when no API key is configured and in tests.

pub mod templates;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::config::Config;

pub use templates::EmailMessage;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("request to email provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email provider returned {status}: {body}")]
    Provider { status: u16, body: String },
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}

/// Pick the provider for the current configuration
pub fn provider_from_config(config: &Config) -> Result<Arc<dyn EmailService>, EmailError> {
    match &config.sendgrid_api_key {
        Some(key) => {
            tracing::info!("Email delivery via SendGrid");
            Ok(Arc::new(SendGridProvider::new(key.clone(), config.email_from.clone())?))
        }
        None => {
            tracing::warn!("SENDGRID_API_KEY not set, emails will only be logged");
            Ok(Arc::new(ConsoleProvider::default()))
        }
    }
}

pub struct SendGridProvider {
    api_key: String,
    from: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct SendGridAddress<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct SendGridPersonalization<'a> {
    to: Vec<SendGridAddress<'a>>,
}

#[derive(Serialize)]
struct SendGridContent<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct SendGridRequest<'a> {
    personalizations: Vec<SendGridPersonalization<'a>>,
    from: SendGridAddress<'a>,
    subject: &'a str,
    content: Vec<SendGridContent<'a>>,
}

impl SendGridProvider {
    pub fn new(api_key: String, from: String) -> Result<Self, EmailError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| EmailError::Client(e.to_string()))?;

        Ok(Self { api_key, from, client })
    }
}

#[async_trait]
impl EmailService for SendGridProvider {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let request = SendGridRequest {
            personalizations: vec![SendGridPersonalization {
                to: vec![SendGridAddress { email: &message.to }],
            }],
            from: SendGridAddress { email: &self.from },
            subject: &message.subject,
            content: vec![
                SendGridContent { content_type: "text/plain", value: &message.text },
                SendGridContent { content_type: "text/html", value: &message.html },
            ],
        };

        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Provider { status, body });
        }

        tracing::info!("Email '{}' sent to {}", message.subject, message.to);
        Ok(())
    }
}

/// Logs messages instead of sending them and keeps a copy for inspection
#[derive(Default)]
pub struct ConsoleProvider {
    sent: Mutex<Vec<EmailMessage>>,
}

impl ConsoleProvider {
    /// Messages handed to this provider so far
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmailService for ConsoleProvider {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Email not delivered (console provider):\n{}",
            message.text
        );
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        Ok(())
    }
}

/// Send in the background; failures are only logged
pub fn send_in_background(email: Arc<dyn EmailService>, message: EmailMessage) {
    tokio::spawn(async move {
        let to = message.to.clone();
        if let Err(e) = email.send(message).await {
            tracing::error!("Failed to send email to {}: {}", to, e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_provider_records_messages() {
        let provider = ConsoleProvider::default();
        provider
            .send(templates::password_reset(
                "casal@example.com",
                "http://localhost:5173/reset-password?token=abc",
            ))
            .await
            .unwrap();

        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "casal@example.com");
    }

    #[test]
    fn test_sendgrid_payload_shape() {
        let message = templates::welcome("novo@example.com", "Maria", "http://localhost:5173/login");
        let request = SendGridRequest {
            personalizations: vec![SendGridPersonalization {
                to: vec![SendGridAddress { email: &message.to }],
            }],
            from: SendGridAddress { email: "noreply@example.com" },
            subject: &message.subject,
            content: vec![SendGridContent { content_type: "text/plain", value: &message.text }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["personalizations"][0]["to"][0]["email"], "novo@example.com");
        assert_eq!(json["from"]["email"], "noreply@example.com");
        assert_eq!(json["content"][0]["type"], "text/plain");
    }
}
