use std::sync::Arc;

use crate::{domain::ChatId, messaging::port::MessagingPort};

/// Outcome of relaying one address to every destination.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub delivered: Vec<ChatId>,
    pub failed: Vec<(ChatId, String)>,
}

impl RelayReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sends newly detected addresses to the configured destination chats.
#[derive(Clone)]
pub struct Relay {
    messenger: Arc<dyn MessagingPort>,
    destinations: Vec<ChatId>,
}

impl Relay {
    pub fn new(messenger: Arc<dyn MessagingPort>, destinations: Vec<ChatId>) -> Self {
        Self {
            messenger,
            destinations,
        }
    }

    /// Send `address` to every destination.
    ///
    /// A failing destination is logged and recorded; the remaining ones are
    /// still attempted.
    pub async fn forward(&self, address: &str) -> RelayReport {
        let mut report = RelayReport::default();
        for &dest in &self.destinations {
            match self.messenger.send_text(dest, address).await {
                Ok(_) => {
                    tracing::info!(address, destination = dest.0, "forwarded");
                    report.delivered.push(dest);
                }
                Err(e) => {
                    tracing::warn!(address, destination = dest.0, "forward failed: {e}");
                    report.failed.push((dest, e.to_string()));
                }
            }
        }
        report
    }
}
