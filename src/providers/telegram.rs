use crate::core::config::TelegramConfig;
use crate::core::notify::Notifier;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

/// Sends messages through the Telegram Bot API.
pub struct TelegramNotifier {
    base_url: String,
    bot_token: Option<String>,
    chat_id: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
    result: Option<serde_json::Value>,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("etf-tracker/1.0")
            .timeout(timeout)
            .build()?;
        Ok(TelegramNotifier {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            client,
        })
    }

    fn token(&self) -> Result<&str> {
        self.bot_token
            .as_deref()
            .ok_or_else(|| anyhow!("TELEGRAM_BOT_TOKEN is not set"))
    }

    fn method_url(&self, method: &str) -> Result<String> {
        Ok(format!("{}/bot{}/{}", self.base_url, self.token()?, method))
    }

    /// Checks the bot token and returns the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let url = self.method_url("getMe")?;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Request error calling getMe")?;
        let status = response.status();
        let body: TelegramResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse getMe response ({status})"))?;
        if !body.ok {
            return Err(anyhow!(
                "Telegram getMe failed: {}",
                body.description.unwrap_or_else(|| status.to_string())
            ));
        }
        body.result
            .as_ref()
            .and_then(|r| r.get("username"))
            .and_then(|u| u.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Telegram getMe response has no username"))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(name = "TelegramSend", skip_all, fields(len = text.len()))]
    async fn send(&self, text: &str) -> Result<()> {
        let url = self.method_url("sendMessage")?;
        let chat_id = self
            .chat_id
            .as_deref()
            .ok_or_else(|| anyhow!("TELEGRAM_CHAT_ID is not set"))?;

        let payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .context("Request error sending Telegram message")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("Telegram returned {}: {}", status, detail));
        }
        debug!("Telegram message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier(server: &MockServer, token: Option<&str>, chat: Option<&str>) -> TelegramNotifier {
        let config = TelegramConfig {
            base_url: server.uri(),
            bot_token: token.map(str::to_string),
            chat_id: chat.map(str::to_string),
        };
        TelegramNotifier::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_send_posts_markdown_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(json!({
                "chat_id": "42",
                "text": "*hello*",
                "parse_mode": "Markdown"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok": true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let result = notifier(&server, Some("123:abc"), Some("42"))
            .send("*hello*")
            .await;
        assert!(result.is_ok(), "send failed: {:?}", result.err());
    }

    #[tokio::test]
    async fn test_send_reports_api_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"ok": false, "description": "Bad Request: chat not found"}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let err = notifier(&server, Some("123:abc"), Some("42"))
            .send("text")
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Telegram returned 400 Bad Request"));
        assert!(err.to_string().contains("chat not found"));
    }

    #[tokio::test]
    async fn test_send_requires_credentials() {
        let server = MockServer::start().await;

        let err = notifier(&server, None, Some("42")).send("x").await.unwrap_err();
        assert_eq!(err.to_string(), "TELEGRAM_BOT_TOKEN is not set");

        let err = notifier(&server, Some("t"), None).send("x").await.unwrap_err();
        assert_eq!(err.to_string(), "TELEGRAM_CHAT_ID is not set");
    }

    #[tokio::test]
    async fn test_get_me() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bot123:abc/getMe"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"ok": true, "result": {"id": 1, "is_bot": true, "username": "etf_bot"}}"#,
            ))
            .mount(&server)
            .await;

        let name = notifier(&server, Some("123:abc"), None)
            .get_me()
            .await
            .unwrap();
        assert_eq!(name, "etf_bot");
    }

    #[tokio::test]
    async fn test_get_me_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bot123:abc/getMe"))
            .respond_with(ResponseTemplate::new(401).set_body_string(
                r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#,
            ))
            .mount(&server)
            .await;

        let err = notifier(&server, Some("123:abc"), None)
            .get_me()
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Telegram getMe failed: Unauthorized");
    }
}
