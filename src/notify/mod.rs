//! Booking notification emails
//!
//! Sends are best-effort: a failed email is logged and never fails
//! the booking request that triggered it.
pub mod ics;

pub use ics::generate_ics;

use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde_json::json;

use crate::core::AppConfig;

pub struct Mailer {
    http: Client,
    api_hostname: String,
    api_key: String,
    from: String,
}

impl Mailer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: Client::new(),
            api_hostname: config.email_api_hostname.clone(),
            api_key: config.email_api_key.clone(),
            from: config.email_from.clone(),
        }
    }

    /// Send a booking email with the invite attached as an ICS file.
    pub async fn send_booking_email(
        &self,
        to: &str,
        subject: &str,
        text: &str,
        ics_content: &str,
    ) -> Result<()> {
        if self.api_key.is_empty() {
            // No email provider configured (dev and test setups)
            tracing::debug!("Email sending disabled, skipping \"{}\" to {}", subject, to);
            return Ok(());
        }

        let response = self
            .http
            .post(format!("{}/emails", self.api_hostname))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "html": format!("<p>{}</p>", text),
                "attachments": [{
                    "filename": "invite.ics",
                    "content": STANDARD.encode(ics_content),
                    "content_type": "text/calendar",
                }],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Email send failed ({}): {}", status, body));
        }
        Ok(())
    }

    /// Fire-and-forget variant used by the booking flow.
    pub async fn try_send(&self, to: &str, subject: &str, text: &str, ics_content: &str) {
        if let Err(err) = self.send_booking_email(to, subject, text, ics_content).await {
            tracing::warn!("Failed to send \"{}\" email to {}: {}", subject, to, err);
        }
    }
}
