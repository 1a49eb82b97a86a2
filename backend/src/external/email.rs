//! Transactional email client
//!
//! Thin wrapper over the Brevo v3 REST API. Used only by the notification
//! dispatcher; delivery failures are reported to the caller, which logs and
//! moves on.

use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Transactional email client
#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_key: String,
    base_url: String,
    sender: String,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    sender: EmailAddress<'a>,
    to: Vec<EmailAddress<'a>>,
    subject: &'a str,
    #[serde(rename = "textContent")]
    text_content: &'a str,
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
}

impl EmailClient {
    pub fn new(base_url: String, api_key: String, sender: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            sender,
        }
    }

    /// Send a plain-text transactional email
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let url = format!("{}/smtp/email", self.base_url);

        let request = SendEmailRequest {
            sender: EmailAddress { email: &self.sender },
            to: vec![EmailAddress { email: to }],
            subject,
            text_content: body,
        };

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::EmailServiceError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::EmailServiceError(format!(
                "API returned {}: {}",
                status, text
            )));
        }

        Ok(())
    }
}
