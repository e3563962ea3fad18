//! WhatsApp Business Cloud API transport.
//!
//! Uses the official WhatsApp Business Platform (Cloud API) for outbound
//! text messages. Requires: Access Token + Phone Number ID from Meta
//! Business Suite. Each send is bounded by the configured timeout; the Cloud
//! API applies its own rate limits on top of the dispatcher's pacing.

use async_trait::async_trait;
use zapdrip_core::config::WhatsAppConfig;
use zapdrip_core::error::{Result, ZapDripError};
use zapdrip_core::traits::Transport;

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v21.0";

/// WhatsApp Cloud API transport.
pub struct WhatsAppTransport {
    config: WhatsAppConfig,
    client: reqwest::Client,
    connected: bool,
}

impl WhatsAppTransport {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            connected: false,
        }
    }

    /// Send a text message to `to` (digits only, country prefix included).
    async fn send_text_message(&self, to: &str, text: &str) -> Result<String> {
        let url = format!("{GRAPH_API_BASE}/{}/messages", self.config.phone_number_id);

        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "text",
            "text": {
                "preview_url": false,
                "body": text
            }
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.access_token))
            .header("Content-Type", "application/json")
            .json(&body)
            .timeout(std::time::Duration::from_secs(self.config.send_timeout_secs))
            .send()
            .await
            .map_err(|e| ZapDripError::Channel(format!("WhatsApp API request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ZapDripError::Channel(format!(
                "WhatsApp API error {status}: {error_text}"
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ZapDripError::Channel(format!("Invalid WhatsApp response: {e}")))?;

        let msg_id = result["messages"][0]["id"]
            .as_str()
            .unwrap_or("unknown")
            .to_string();

        tracing::debug!("WhatsApp message accepted: {} → {}", msg_id, to);
        Ok(msg_id)
    }
}

#[async_trait]
impl Transport for WhatsAppTransport {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn connect(&mut self) -> Result<()> {
        if self.config.access_token.is_empty() {
            return Err(ZapDripError::Config(
                "WhatsApp access_token not configured".into(),
            ));
        }
        if self.config.phone_number_id.is_empty() {
            return Err(ZapDripError::Config(
                "WhatsApp phone_number_id not configured".into(),
            ));
        }

        // Verify the token by reading the phone number object
        let url = format!("{GRAPH_API_BASE}/{}", self.config.phone_number_id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.config.access_token))
            .send()
            .await
            .map_err(|e| ZapDripError::Channel(format!("WhatsApp verification failed: {e}")))?;

        if response.status().is_success() {
            self.connected = true;
            tracing::info!(
                "WhatsApp Business: connected (phone_id={})",
                self.config.phone_number_id
            );
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(ZapDripError::Channel(format!(
                "WhatsApp token verification failed: {text}"
            )))
        }
    }

    async fn send(&self, phone: &str, message: &str) -> Result<()> {
        self.send_text_message(phone, message).await?;
        Ok(())
    }
}
