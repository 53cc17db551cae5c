//! Telegram adapter (teloxide).
//!
//! Implements the `caw-core` messaging and heartbeat ports over the Telegram
//! Bot API and turns incoming updates into core `IncomingMessage`s.

use std::time::Duration;

use async_trait::async_trait;

use teloxide::prelude::*;

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use caw_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    heartbeat::Heartbeat,
    messaging::port::MessagingPort,
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match retry_delay(&e, attempts) {
                    Some(wait) => {
                        attempts += 1;
                        tracing::warn!(?wait, "telegram flood limit, retrying");
                        sleep(wait).await;
                    }
                    None => return Err(Self::map_err(e)),
                },
            }
        }
    }
}

/// How long to wait before retrying, if `e` is worth one more attempt.
fn retry_delay(e: &teloxide::RequestError, attempts: usize) -> Option<Duration> {
    const MAX_RETRIES: usize = 1;
    match e {
        teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => Some(*d),
        _ => None,
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), text.to_string())
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }
}

#[async_trait]
impl Heartbeat for TelegramMessenger {
    async fn ping(&self) -> Result<()> {
        self.bot.get_me().await.map_err(Self::map_err)?;
        Ok(())
    }
}
