use chrono::{DateTime, Utc};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// A chat message as seen by the monitor, independent of the client library.
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub sender_id: Option<UserId>,
    pub sender_username: Option<String>,
    pub text: String,
    pub date: DateTime<Utc>,
}

impl IncomingMessage {
    /// Who sent it, for log lines: username if known, else the numeric id.
    pub fn sender_key(&self) -> String {
        match (&self.sender_username, self.sender_id) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, Some(id)) => id.0.to_string(),
            _ => "unknown".to_string(),
        }
    }
}
