//! Per-message processing: filter, extract, dedupe, persist, relay.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{
    domain::{ChatId, IncomingMessage},
    errors::Error,
    extract::{extract, Detection},
    filter::OriginFilter,
    history::{seed_from_history, HistorySource},
    metrics::Metrics,
    relay::Relay,
    seen::{DetectionLog, DetectionRecord, SeenSet},
    stream::MessageStream,
    text::strip_urls,
    utils::{short_address, truncate_text},
    Result,
};

/// Rebuild the blacklist: everything in the detection log, then everything
/// posted in the watched chats during the last `lookback`.
pub async fn bootstrap_seen(
    log: &DetectionLog,
    history: &dyn HistorySource,
    chats: &[ChatId],
    lookback: TimeDelta,
) -> Result<SeenSet> {
    let mut seen = SeenSet::new();
    seen.extend(log.load_addresses()?);
    tracing::info!(
        count = seen.len(),
        path = %log.path().display(),
        "loaded blacklisted contracts"
    );

    let since = Utc::now()
        .checked_sub_signed(lookback)
        .ok_or_else(|| Error::Config(format!("lookback of {lookback} is out of range")))?;
    let added = seed_from_history(history, chats, since, &mut seen).await;
    tracing::info!(
        added,
        total = seen.len(),
        lookback_days = lookback.num_days(),
        "seeded contracts from history"
    );
    Ok(seen)
}

/// The message loop's core: owns the blacklist and the outbound side.
pub struct Monitor {
    filter: OriginFilter,
    seen: Mutex<SeenSet>,
    log: DetectionLog,
    relay: Relay,
    metrics: Arc<Metrics>,
}

impl Monitor {
    pub fn new(
        filter: OriginFilter,
        seen: SeenSet,
        log: DetectionLog,
        relay: Relay,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            filter,
            seen: Mutex::new(seen),
            log,
            relay,
            metrics,
        }
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub async fn seen_count(&self) -> usize {
        self.seen.lock().await.len()
    }

    /// Process one inbound message; returns the addresses reported for the
    /// first time.
    ///
    /// Each new address is written to the detection log and then relayed. A
    /// log write failure is logged and does not hold back the relay.
    pub async fn handle(&self, msg: &IncomingMessage) -> Vec<Detection> {
        let started = Instant::now();
        if !self.filter.accepts(msg) {
            return Vec::new();
        }

        let detections = extract(&strip_urls(&msg.text));
        let fresh: Vec<Detection> = {
            let mut seen = self.seen.lock().await;
            detections
                .into_iter()
                .filter(|d| seen.insert(d.address.clone()))
                .collect()
        };

        for d in &fresh {
            self.metrics.record_detection();
            let record = DetectionRecord::new(d, msg);
            if let Err(e) = self.log.append(&record) {
                tracing::error!(address = %d.address, "failed to write detection log: {e}");
            }
            tracing::info!(
                kind = %d.kind,
                chat = msg.chat_id.0,
                message_id = msg.message_id.0,
                sender = %msg.sender_key(),
                evidence = %truncate_text(&d.evidence, 120),
                "captured contract {}",
                short_address(&d.address)
            );

            let report = self.relay.forward(&d.address).await;
            if !report.all_delivered() {
                tracing::warn!(
                    address = %d.address,
                    failed = report.failed.len(),
                    delivered = report.delivered.len(),
                    "relay incomplete"
                );
            }
            self.metrics
                .record_forwards(report.delivered.len(), report.failed.len());
        }

        self.metrics.record_message(started.elapsed());
        fresh
    }

    /// Drain `stream` until every producer is gone; returns messages handled.
    pub async fn run<S: MessageStream>(&self, mut stream: S) -> u64 {
        let mut handled = 0u64;
        while let Some(msg) = stream.next().await {
            self.handle(&msg).await;
            handled += 1;
        }
        tracing::info!(handled, "message stream ended");
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MessageId, MessageRef, UserId},
        errors::Error,
        extract::DetectionKind,
        filter::SenderRule,
        history::NoHistory,
        messaging::port::MessagingPort,
        stream::channel,
    };
    use async_trait::async_trait;
    use std::{path::PathBuf, sync::Mutex as StdMutex, time::Duration};

    const ADDR: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const OTHER: &str = "EjmyN6qEC1Tf1JxiG1ae7UTJhUxSwk1TCWNWqxWV4pum";
    const WATCHED: ChatId = ChatId(-4945112939);
    const DEST: ChatId = ChatId(7181780057);

    #[derive(Default)]
    struct FakeMessenger {
        fail: bool,
        sent: StdMutex<Vec<(ChatId, String)>>,
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
            if self.fail {
                return Err(Error::External("bot was blocked".to_string()));
            }
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }
    }

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.log"))
    }

    fn msg(chat: ChatId, user: i64, text: &str) -> IncomingMessage {
        IncomingMessage {
            chat_id: chat,
            message_id: MessageId(7),
            sender_id: Some(UserId(user)),
            sender_username: Some("caller".to_string()),
            text: text.to_string(),
            date: Utc::now(),
        }
    }

    fn monitor(messenger: Arc<FakeMessenger>, log_path: &PathBuf, seen: SeenSet) -> Monitor {
        Monitor::new(
            OriginFilter::new(vec![WATCHED], vec![SenderRule::Id(UserId(448480473))]),
            seen,
            DetectionLog::new(log_path, false),
            Relay::new(messenger, vec![DEST]),
            Arc::new(Metrics::new()),
        )
    }

    #[tokio::test]
    async fn new_address_is_logged_and_forwarded_once() {
        let messenger = Arc::new(FakeMessenger::default());
        let path = tmp_file("caw-pipeline");
        let m = monitor(messenger.clone(), &path, SeenSet::new());

        let out = m.handle(&msg(WATCHED, 448480473, &format!("ape {ADDR}"))).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, DetectionKind::Standard);

        // Same address again: already seen.
        let out = m.handle(&msg(WATCHED, 448480473, &format!("again {ADDR}"))).await;
        assert!(out.is_empty());

        let sent = messenger.sent.lock().unwrap().clone();
        assert_eq!(sent, vec![(DEST, ADDR.to_string())]);

        let log = std::fs::read_to_string(&path).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.starts_with(&format!("{ADDR}\tfrom: -4945112939\tby: caller\tmsg_id: 7")));

        let s = m.metrics().snapshot();
        assert_eq!(s.messages_processed, 2);
        assert_eq!(s.contracts_detected, 1);
        assert_eq!(s.forwards_ok, 1);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn filtered_messages_are_ignored() {
        let messenger = Arc::new(FakeMessenger::default());
        let path = tmp_file("caw-pipeline-filter");
        let m = monitor(messenger.clone(), &path, SeenSet::new());

        assert!(m.handle(&msg(ChatId(-1), 448480473, ADDR)).await.is_empty());
        assert!(m.handle(&msg(WATCHED, 1, ADDR)).await.is_empty());
        assert!(messenger.sent.lock().unwrap().is_empty());
        assert_eq!(m.seen_count().await, 0);
    }

    #[tokio::test]
    async fn addresses_inside_links_are_not_reported() {
        let messenger = Arc::new(FakeMessenger::default());
        let path = tmp_file("caw-pipeline-url");
        let m = monitor(messenger.clone(), &path, SeenSet::new());

        let text = format!("chart https://dexscreener.com/solana/{ADDR}");
        assert!(m.handle(&msg(WATCHED, 448480473, &text)).await.is_empty());
    }

    #[tokio::test]
    async fn blacklisted_addresses_are_skipped() {
        let messenger = Arc::new(FakeMessenger::default());
        let path = tmp_file("caw-pipeline-seen");
        let mut seen = SeenSet::new();
        seen.insert(ADDR);
        let m = monitor(messenger.clone(), &path, seen);

        let text = format!("{ADDR}\n{OTHER}");
        let out = m.handle(&msg(WATCHED, 448480473, &text)).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].address, OTHER);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn forward_failure_still_records_detection() {
        let messenger = Arc::new(FakeMessenger {
            fail: true,
            ..Default::default()
        });
        let path = tmp_file("caw-pipeline-fail");
        let m = monitor(messenger, &path, SeenSet::new());

        let out = m.handle(&msg(WATCHED, 448480473, ADDR)).await;
        assert_eq!(out.len(), 1);
        assert_eq!(m.metrics().snapshot().forward_errors, 1);
        assert!(std::fs::read_to_string(&path).unwrap().contains(ADDR));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn run_drains_the_stream() {
        let messenger = Arc::new(FakeMessenger::default());
        let path = tmp_file("caw-pipeline-run");
        let m = monitor(messenger.clone(), &path, SeenSet::new());

        let (sink, stream) = channel(8);
        sink.push(msg(WATCHED, 448480473, ADDR)).await.unwrap();
        sink.push(msg(WATCHED, 448480473, "gm")).await.unwrap();
        sink.push(msg(WATCHED, 448480473, OTHER)).await.unwrap();
        drop(sink);

        assert_eq!(m.run(stream).await, 3);
        assert_eq!(messenger.sent.lock().unwrap().len(), 2);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn bootstrap_rejects_out_of_range_lookback() {
        let log = DetectionLog::new(tmp_file("caw-bootstrap-range"), false);
        let err = bootstrap_seen(&log, &NoHistory, &[WATCHED], TimeDelta::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn bootstrap_reads_the_log() {
        let path = tmp_file("caw-bootstrap");
        std::fs::write(&path, format!("{ADDR}\tfrom: 1\tby: x\tmsg_id: 1\n")).unwrap();
        let log = DetectionLog::new(&path, false);

        let seen = bootstrap_seen(&log, &NoHistory, &[WATCHED], TimeDelta::days(30))
            .await
            .unwrap();
        assert!(seen.contains(ADDR));
        assert_eq!(seen.len(), 1);
        let _ = std::fs::remove_file(&path);
    }
}
