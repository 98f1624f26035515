use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, multipart};
use serde_json::json;

use crate::{
    error::{BotError, Result},
    models::{
        ChatId,
        telegram::{BotCommand, ReplyMarkup},
    },
};

// Bot API limits
const MAX_TEXT: usize = 4096;
const MAX_CAPTION: usize = 1024;

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send_message(&self, chat_id: ChatId, text: &str, markup: Option<&ReplyMarkup>)
    -> Result<()>;

    async fn send_photo(&self, chat_id: ChatId, png: Vec<u8>, caption: &str) -> Result<()>;

    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    base: String,
    configured: bool,
}

/// Cuts `text` to at most `max` chars on a char boundary.
pub fn clip(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str, timeout_secs: u64) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
            configured: !token.trim().is_empty(),
        }
    }

    async fn call_json(&self, method: &str, payload: serde_json::Value) -> Result<()> {
        if !self.configured {
            return Err(BotError::NotConfigured("TELEGRAM_TOKEN"));
        }

        let res = self
            .http
            .post(format!("{}/{}", self.base, method))
            .json(&payload)
            .send()
            .await?;

        check(method, res).await
    }

    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<()> {
        let mut payload = json!({
            "url": url,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(secret) = secret {
            payload["secret_token"] = json!(secret);
        }
        self.call_json("setWebhook", payload).await
    }

    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<()> {
        self.call_json("setMyCommands", json!({ "commands": commands }))
            .await
    }
}

async fn check(method: &str, res: reqwest::Response) -> Result<()> {
    if res.status().is_success() {
        return Ok(());
    }

    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    tracing::warn!(method, status, %body, "telegram call failed");

    Err(BotError::Api {
        service: "telegram",
        status,
        body,
    })
}

#[async_trait]
impl ChatSender for TelegramClient {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<()> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": clip(text, MAX_TEXT),
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if let Some(markup) = markup {
            payload["reply_markup"] = serde_json::to_value(markup)?;
        }

        self.call_json("sendMessage", payload).await
    }

    async fn send_photo(&self, chat_id: ChatId, png: Vec<u8>, caption: &str) -> Result<()> {
        if !self.configured {
            return Err(BotError::NotConfigured("TELEGRAM_TOKEN"));
        }

        let photo = multipart::Part::bytes(png)
            .file_name("chart.png")
            .mime_str("image/png")?;

        let form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", clip(caption, MAX_CAPTION))
            .text("parse_mode", "HTML")
            .part("photo", photo);

        let res = self
            .http
            .post(format!("{}/sendPhoto", self.base))
            .multipart(form)
            .send()
            .await?;

        check("sendPhoto", res).await
    }

    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<()> {
        self.call_json(
            "answerCallbackQuery",
            json!({
                "callback_query_id": callback_id,
                "text": text,
                "show_alert": false,
            }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_respects_char_boundaries() {
        assert_eq!(clip("ciao", 10), "ciao");
        assert_eq!(clip("📈📉📊", 2), "📈📉");
        assert_eq!(clip("", 3), "");
    }

    #[tokio::test]
    async fn unconfigured_client_refuses_to_send() {
        let client = TelegramClient::new("https://api.telegram.org", "", 5);
        let err = client.send_message(1, "hi", None).await.unwrap_err();
        assert!(matches!(err, BotError::NotConfigured("TELEGRAM_TOKEN")));
    }
}
