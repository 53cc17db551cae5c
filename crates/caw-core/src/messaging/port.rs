use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    Result,
};

/// Outbound messaging port used to relay detected addresses.
///
/// Telegram is the only implementation; tests use in-memory fakes.
#[async_trait]
pub trait MessagingPort: Send + Sync {

    /// Send plain text (no markup parsing) to a chat.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;
}
