//! Telegram update handlers.
//!
//! Handlers only translate: every watched message (group post or channel post)
//! becomes an `IncomingMessage` pushed onto the monitor's stream. Filtering by
//! sender, extraction and relaying all happen in `caw-core`.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use caw_core::domain::ChatId;

use crate::router::RouterState;

mod text;

pub use text::{pick_text, to_incoming};

pub async fn handle_message(msg: Message, state: Arc<RouterState>) -> ResponseResult<()> {
    // Cheap pre-check so unwatched chats never reach the queue.
    if !state.filter.watches_chat(ChatId(msg.chat.id.0)) {
        return Ok(());
    }

    let Some(incoming) = to_incoming(&msg) else {
        return Ok(());
    };

    if let Err(e) = state.sink.push(incoming).await {
        tracing::error!(chat = msg.chat.id.0, message_id = msg.id.0, "dropping message: {e}");
    }
    Ok(())
}
