//! Lookback seeding: addresses posted before startup count as already seen.
//!
//! Bot API clients cannot page through chat history, so the Telegram host
//! reads a Telegram Desktop JSON export (`result.json`) instead.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::{
    domain::{ChatId, IncomingMessage, MessageId, UserId},
    errors::Error,
    extract::extract,
    seen::SeenSet,
    text::strip_urls,
    Result,
};

/// Source of messages posted before the monitor started.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Messages in `chat_id` newer than `since`, any order.
    async fn recent_messages(
        &self,
        chat_id: ChatId,
        since: DateTime<Utc>,
    ) -> Result<Vec<IncomingMessage>>;
}

/// History source with nothing in it.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHistory;

#[async_trait]
impl HistorySource for NoHistory {
    async fn recent_messages(
        &self,
        _chat_id: ChatId,
        _since: DateTime<Utc>,
    ) -> Result<Vec<IncomingMessage>> {
        Ok(Vec::new())
    }
}

/// Mark every address found in recent history as seen.
///
/// A chat whose history cannot be read is logged and skipped. Returns how many
/// addresses were newly added.
pub async fn seed_from_history(
    source: &dyn HistorySource,
    chats: &[ChatId],
    since: DateTime<Utc>,
    seen: &mut SeenSet,
) -> usize {
    let mut added = 0usize;
    for &chat in chats {
        let messages = match source.recent_messages(chat, since).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(chat = chat.0, "history unavailable: {e}");
                continue;
            }
        };
        for msg in messages.iter().filter(|m| m.date >= since) {
            for d in extract(&strip_urls(&msg.text)) {
                if seen.insert(d.address) {
                    added += 1;
                }
            }
        }
    }
    added
}

// ============== Telegram Desktop export ==============

#[derive(Debug, Deserialize)]
struct ExportFile {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    messages: Option<Vec<ExportMessage>>,
    #[serde(default)]
    chats: Option<ExportChatList>,
}

#[derive(Debug, Deserialize)]
struct ExportChatList {
    list: Vec<ExportChat>,
}

#[derive(Debug, Deserialize)]
struct ExportChat {
    id: i64,
    #[serde(default)]
    messages: Vec<ExportMessage>,
}

#[derive(Debug, Deserialize)]
struct ExportMessage {
    id: i32,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    date_unixtime: Option<String>,
    #[serde(default)]
    from_id: Option<String>,
    #[serde(default)]
    text: ExportText,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportText {
    Plain(String),
    Parts(Vec<ExportTextPart>),
}

impl Default for ExportText {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExportTextPart {
    Plain(String),
    Entity { text: String },
}

impl ExportText {
    fn flatten(&self) -> String {
        match self {
            Self::Plain(s) => s.clone(),
            Self::Parts(parts) => parts
                .iter()
                .map(|p| match p {
                    ExportTextPart::Plain(s) => s.as_str(),
                    ExportTextPart::Entity { text } => text.as_str(),
                })
                .collect(),
        }
    }
}

impl ExportMessage {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        if let Some(ts) = self
            .date_unixtime
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
        {
            return DateTime::from_timestamp(ts, 0);
        }
        let raw = self.date.as_deref()?;
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .map(|n| n.and_utc())
    }

    fn sender_id(&self) -> Option<UserId> {
        self.from_id
            .as_deref()?
            .strip_prefix("user")?
            .parse::<i64>()
            .ok()
            .map(UserId)
    }

    fn into_incoming(self, chat_id: ChatId) -> Option<IncomingMessage> {
        if self.kind != "message" {
            return None;
        }
        let date = self.timestamp()?;
        // Exports carry display names (`from`), not usernames.
        Some(IncomingMessage {
            chat_id,
            message_id: MessageId(self.id),
            sender_id: self.sender_id(),
            sender_username: None,
            text: self.text.flatten(),
            date,
        })
    }
}

/// Whether an export's bare chat id refers to `chat`.
///
/// Exports drop the Bot API sign/prefix: a supergroup `-1001234` is exported
/// as `1234`, a basic group `-1234` as `1234`.
fn export_id_matches(export_id: i64, chat: ChatId) -> bool {
    const SUPERGROUP_OFFSET: i64 = 1_000_000_000_000;
    chat.0 == export_id || chat.0 == -export_id || chat.0 == -(SUPERGROUP_OFFSET + export_id)
}

/// History read from a Telegram Desktop JSON export.
#[derive(Debug)]
pub struct ExportHistory {
    path: PathBuf,
    chats: Vec<(i64, Vec<IncomingMessage>)>,
}

impl ExportHistory {
    /// Parse a single-chat or full-account export.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw = tokio::fs::read_to_string(&path).await?;
        Self::parse(&path, &raw)
    }

    fn parse(path: &Path, raw: &str) -> Result<Self> {
        let file: ExportFile = serde_json::from_str(raw).map_err(|e| Error::InvalidExport {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut raw_chats: Vec<(i64, Vec<ExportMessage>)> = Vec::new();
        if let (Some(id), Some(messages)) = (file.id, file.messages) {
            raw_chats.push((id, messages));
        }
        if let Some(list) = file.chats {
            raw_chats.extend(list.list.into_iter().map(|c| (c.id, c.messages)));
        }
        if raw_chats.is_empty() {
            return Err(Error::InvalidExport {
                path: path.to_path_buf(),
                reason: "no chats found".to_string(),
            });
        }

        let chats = raw_chats
            .into_iter()
            .map(|(id, messages)| {
                let msgs = messages
                    .into_iter()
                    .filter_map(|m| m.into_incoming(ChatId(id)))
                    .collect();
                (id, msgs)
            })
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            chats,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn message_count(&self) -> usize {
        self.chats.iter().map(|(_, m)| m.len()).sum()
    }
}

#[async_trait]
impl HistorySource for ExportHistory {
    async fn recent_messages(
        &self,
        chat_id: ChatId,
        since: DateTime<Utc>,
    ) -> Result<Vec<IncomingMessage>> {
        Ok(self
            .chats
            .iter()
            .filter(|(id, _)| export_id_matches(*id, chat_id))
            .flat_map(|(_, msgs)| msgs.iter())
            .filter(|m| m.date >= since)
            .map(|m| IncomingMessage { chat_id, ..m.clone() })
            .collect())
    }
}
