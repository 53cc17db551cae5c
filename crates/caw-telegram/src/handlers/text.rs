use teloxide::types::Message;

use caw_core::domain::{ChatId, IncomingMessage, MessageId, UserId};

/// The text worth scanning: message text, else the media caption.
pub fn pick_text<'a>(text: Option<&'a str>, caption: Option<&'a str>) -> Option<&'a str> {
    text.or(caption).filter(|t| !t.trim().is_empty())
}

/// Convert a Telegram message into the core model.
///
/// Anonymous admins and channel posts have no `from`; the sending chat stands
/// in for the sender so allow-lists can still name it.
pub fn to_incoming(msg: &Message) -> Option<IncomingMessage> {
    let text = pick_text(msg.text(), msg.caption())?;

    let (sender_id, sender_username) = match (msg.from(), msg.sender_chat()) {
        (Some(user), _) => (Some(UserId(user.id.0 as i64)), user.username.clone()),
        (None, Some(chat)) => (
            Some(UserId(chat.id.0)),
            chat.username().map(|s| s.to_string()),
        ),
        (None, None) => (None, None),
    };

    Some(IncomingMessage {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
        sender_id,
        sender_username,
        text: text.to_string(),
        date: msg.date,
    })
}
