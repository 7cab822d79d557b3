use crate::config::MailConfig;
use crate::error::{CauseListError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Outbound message delivery.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, address: &str, subject: &str, body: &str) -> Result<()>;
}

/// Resend-compatible send request.
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: &'a str,
}

/// Delivers plain-text mail through an HTTP mail API.
pub struct MailApiTransport {
    client: Client,
    api_url: String,
    from: String,
    api_key: Option<String>,
}

impl MailApiTransport {
    pub fn new(client: Client, config: &MailConfig) -> Result<Self> {
        if config.from.trim().is_empty() {
            return Err(CauseListError::MissingField("mail.from".into()));
        }
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            from: config.from.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Transport for MailApiTransport {
    async fn deliver(&self, address: &str, subject: &str, body: &str) -> Result<()> {
        let request = SendEmailRequest {
            from: &self.from,
            to: vec![address],
            subject,
            text: body,
        };

        let mut builder = self.client.post(&self.api_url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let delivery_error = |e: reqwest::Error| CauseListError::Delivery {
            address: address.to_string(),
            message: e.to_string(),
        };
        builder
            .send()
            .await
            .map_err(delivery_error)?
            .error_for_status()
            .map_err(delivery_error)?;
        Ok(())
    }
}

/// Dry-run transport: logs instead of sending.
#[derive(Default)]
pub struct LogTransport {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl LogTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// (address, body) pairs delivered so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Transport for LogTransport {
    async fn deliver(&self, address: &str, subject: &str, body: &str) -> Result<()> {
        info!(to = address, subject, "dry-run delivery:\n{}", body);
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((address.to_string(), body.to_string()));
        }
        Ok(())
    }
}
