use crate::domain::{ChatId, IncomingMessage, UserId};

/// One entry of the sender allow-list: a numeric id or a username.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SenderRule {
    Id(UserId),
    Username(String),
}

impl SenderRule {
    /// Parse a config token: digits (optionally negative) are ids, anything else
    /// is a username with an optional leading `@`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(id) = raw.parse::<i64>() {
            return Some(Self::Id(UserId(id)));
        }
        let name = raw.trim_start_matches('@');
        if name.is_empty() {
            return None;
        }
        Some(Self::Username(name.to_lowercase()))
    }

    fn matches(&self, msg: &IncomingMessage) -> bool {
        match self {
            Self::Id(id) => msg.sender_id == Some(*id),
            Self::Username(name) => msg
                .sender_username
                .as_deref()
                .map(|u| u.trim_start_matches('@').eq_ignore_ascii_case(name))
                .unwrap_or(false),
        }
    }
}

/// Which chats are watched and (optionally) whose messages count.
#[derive(Clone, Debug, Default)]
pub struct OriginFilter {
    pub chats: Vec<ChatId>,
    /// Empty means every sender in a watched chat is accepted.
    pub senders: Vec<SenderRule>,
}

impl OriginFilter {
    pub fn new(chats: Vec<ChatId>, senders: Vec<SenderRule>) -> Self {
        Self { chats, senders }
    }

    pub fn watches_chat(&self, chat_id: ChatId) -> bool {
        self.chats.contains(&chat_id)
    }

    pub fn accepts(&self, msg: &IncomingMessage) -> bool {
        if !self.watches_chat(msg.chat_id) {
            return false;
        }
        self.senders.is_empty() || self.senders.iter().any(|r| r.matches(msg))
    }
}
