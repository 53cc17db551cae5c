use std::sync::Arc;

use chrono::TimeDelta;
use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio_util::sync::CancellationToken;

use caw_core::{
    config::Config,
    filter::OriginFilter,
    heartbeat::run_heartbeat,
    history::{ExportHistory, HistorySource, NoHistory},
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    metrics::{run_reporter, Metrics},
    pipeline::{bootstrap_seen, Monitor},
    relay::Relay,
    seen::DetectionLog,
    stream::{channel, MessageSink},
};

use crate::handlers;
use crate::TelegramMessenger;

/// Shared with every update handler.
pub struct RouterState {
    pub filter: OriginFilter,
    pub sink: MessageSink,
}

async fn open_history(cfg: &Config) -> Box<dyn HistorySource> {
    let Some(path) = &cfg.history_export_path else {
        tracing::info!("no HISTORY_EXPORT_PATH set, skipping lookback seeding");
        return Box::new(NoHistory);
    };
    match ExportHistory::open(path.clone()).await {
        Ok(h) => {
            tracing::info!(
                path = %h.path().display(),
                messages = h.message_count(),
                "loaded history export"
            );
            Box::new(h)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "history export unavailable: {e}");
            Box::new(NoHistory)
        }
    }
}

pub async fn run(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(bot = %me.username(), "monitor started"),
        Err(e) => tracing::warn!("get_me failed: {e}"),
    }
    tracing::info!(
        chats = ?cfg.monitored_chats,
        sender_rules = cfg.user_filter.len(),
        destinations = cfg.forward_to.len(),
        "watching"
    );

    let log = DetectionLog::new(cfg.detection_log_path.clone(), cfg.detection_log_json);
    let history = open_history(&cfg).await;
    let lookback = TimeDelta::try_days(cfg.lookback_days)
        .ok_or_else(|| anyhow::anyhow!("LOOKBACK_DAYS out of range: {}", cfg.lookback_days))?;
    let seen = bootstrap_seen(&log, history.as_ref(), &cfg.monitored_chats, lookback).await?;
    drop(history);

    let telegram = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        telegram.clone(),
        ThrottleConfig {
            global_min_interval: cfg.forward_global_interval,
            per_chat_min_interval: cfg.forward_per_chat_interval,
        },
    ));

    let filter = OriginFilter::new(cfg.monitored_chats.clone(), cfg.user_filter.clone());
    let metrics = Arc::new(Metrics::new());
    let monitor = Arc::new(Monitor::new(
        filter.clone(),
        seen,
        log,
        Relay::new(messenger, cfg.forward_to.clone()),
        metrics.clone(),
    ));

    let (sink, stream) = channel(cfg.stream_capacity);
    let cancel = CancellationToken::new();

    let monitor_task = {
        let monitor = monitor.clone();
        tokio::spawn(async move { monitor.run(stream).await })
    };
    let heartbeat_task = tokio::spawn(run_heartbeat(
        telegram,
        cfg.heartbeat_interval,
        cancel.clone(),
    ));
    let reporter_task = tokio::spawn(run_reporter(
        metrics.clone(),
        cfg.metrics_interval,
        cancel.clone(),
    ));

    let state = Arc::new(RouterState { filter, sink });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handlers::handle_message))
        .branch(Update::filter_channel_post().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped, shutting down");
    cancel.cancel();

    // The dispatcher owned the last sink clone; the monitor drains what is
    // queued and then ends.
    let handled = monitor_task.await?;
    let pings = heartbeat_task.await?;
    reporter_task.await?;

    let s = metrics.snapshot();
    tracing::info!(
        handled,
        pings,
        detected = s.contracts_detected,
        forwards_ok = s.forwards_ok,
        forward_errors = s.forward_errors,
        seen = monitor.seen_count().await,
        "monitor stopped"
    );
    Ok(())
}
