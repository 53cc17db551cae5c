//! Single-consumer stream of inbound chat messages.
//!
//! Adapters push messages into a [`MessageSink`]; the monitor drains the paired
//! [`ChannelStream`] one message at a time.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{domain::IncomingMessage, errors::Error, Result};

#[async_trait]
pub trait MessageStream: Send {
    /// Next message, or `None` once every producer is gone.
    async fn next(&mut self) -> Option<IncomingMessage>;
}

/// Producer half handed to adapters.
#[derive(Clone, Debug)]
pub struct MessageSink {
    tx: mpsc::Sender<IncomingMessage>,
}

impl MessageSink {
    pub async fn push(&self, msg: IncomingMessage) -> Result<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| Error::External("message stream closed".to_string()))
    }
}

/// Consumer half backed by a bounded tokio channel.
#[derive(Debug)]
pub struct ChannelStream {
    rx: mpsc::Receiver<IncomingMessage>,
}

/// Create a bounded sink/stream pair.
pub fn channel(capacity: usize) -> (MessageSink, ChannelStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (MessageSink { tx }, ChannelStream { rx })
}

#[async_trait]
impl MessageStream for ChannelStream {
    async fn next(&mut self) -> Option<IncomingMessage> {
        self.rx.recv().await
    }
}
