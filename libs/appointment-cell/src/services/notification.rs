use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;

/// Thin client for the transactional mail HTTP API. When no mail API is
/// configured the send becomes a logged no-op, which keeps local and
/// test environments from needing a mail account.
pub struct MailerService {
    client: Client,
    api_url: String,
    api_key: String,
    from_address: String,
}

impl MailerService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.mail_api_url.clone(),
            api_key: config.mail_api_key.clone(),
            from_address: config.mail_from_address.clone(),
        }
    }

    pub async fn send(&self, to: &str, subject: &str, text: &str) -> Result<()> {
        if self.api_url.is_empty() {
            debug!("Mail API not configured, skipping mail to {}", to);
            return Ok(());
        }

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from_address,
                "to": to,
                "subject": subject,
                "text": text,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Mail API error ({}): {}", status, error_text));
        }

        info!("Sent \"{}\" mail to {}", subject, to);
        Ok(())
    }
}
