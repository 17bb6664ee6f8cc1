use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::core::{BotError, Result};

/// Fire-and-forget delivery of an operator alert.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// GETs the configured url with the message in the `text` query parameter.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("text", text)])
            .send()
            .await
            .map_err(BotError::transport)?;

        if !response.status().is_success() {
            return Err(BotError::Transport(format!(
                "webhook returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: i64,
}

impl TelegramNotifier {
    pub fn new(client: Client, bot_token: impl Into<String>, chat_id: i64) -> Self {
        Self {
            client,
            bot_token: bot_token.into(),
            chat_id,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);

        let response = self
            .client
            .post(&url)
            .json(&SendMessage {
                chat_id: self.chat_id,
                text,
            })
            .send()
            .await
            .map_err(BotError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Transport(format!(
                "telegram returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

/// Used when no delivery channel is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        tracing::info!("📣 {}", text);
        Ok(())
    }
}

/// Delivers to every inner notifier; succeeds if at least one did.
pub struct FanoutNotifier {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let mut last_error = None;
        let mut delivered = false;

        for notifier in &self.notifiers {
            match notifier.send(text).await {
                Ok(()) => delivered = true,
                Err(e) => {
                    tracing::warn!("Notification channel failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !delivered => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fanout_tolerates_one_failing_channel() {
        let mut broken = MockNotifier::new();
        broken
            .expect_send()
            .times(1)
            .returning(|_| Err(BotError::Transport("down".to_string())));
        let mut working = MockNotifier::new();
        working
            .expect_send()
            .withf(|text| text == "hello")
            .times(1)
            .returning(|_| Ok(()));

        let fanout = FanoutNotifier::new(vec![Box::new(broken), Box::new(working)]);
        assert!(fanout.send("hello").await.is_ok());
    }

    #[tokio::test]
    async fn test_fanout_fails_when_all_fail() {
        let mut broken = MockNotifier::new();
        broken
            .expect_send()
            .returning(|_| Err(BotError::Transport("down".to_string())));

        let fanout = FanoutNotifier::new(vec![Box::new(broken)]);
        assert!(fanout.send("hello").await.is_err());
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        assert!(LogNotifier.send("anything").await.is_ok());
    }
}
