use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::Publisher;
use crate::{Error, Result};

const API_BASE: &str = "https://api.telegram.org";

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Publishes through the Telegram Bot API `sendMessage` method
pub struct TelegramPublisher {
    client: Client,
    token: String,
}

impl TelegramPublisher {
    pub fn new(token: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    async fn publish(&self, channel_id: i64, text: &str) -> Result<()> {
        let body = json!({
            "chat_id": channel_id,
            "text": text,
            "parse_mode": "MarkdownV2",
        });

        // The token is part of the URL, keep reqwest's error text out of the logs
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Publish(format!("sendMessage request failed: {}", e.without_url())))?;

        let status = response.status();
        let reply: TelegramResponse = response
            .json()
            .await
            .map_err(|e| Error::Publish(format!("Invalid Telegram response (HTTP {}): {}", status, e.without_url())))?;

        if !reply.ok {
            return Err(Error::Publish(format!(
                "Telegram rejected message (HTTP {}): {}",
                status,
                reply.description.unwrap_or_else(|| "no description".to_string())
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url() {
        let publisher = TelegramPublisher::new("123:abc", 5).unwrap();
        assert_eq!(
            publisher.method_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_parse_rejection() {
        let reply: TelegramResponse = serde_json::from_str(
            r#"{"ok":false,"error_code":400,"description":"Bad Request: can't parse entities"}"#,
        )
        .unwrap();

        assert!(!reply.ok);
        assert_eq!(reply.description.as_deref(), Some("Bad Request: can't parse entities"));
    }
}
