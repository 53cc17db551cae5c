use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Running counters for the monitor.
#[derive(Debug)]
pub struct Metrics {
    started: Instant,
    messages_processed: AtomicU64,
    contracts_detected: AtomicU64,
    forwards_ok: AtomicU64,
    forward_errors: AtomicU64,
    last_processing_us: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            messages_processed: AtomicU64::new(0),
            contracts_detected: AtomicU64::new(0),
            forwards_ok: AtomicU64::new(0),
            forward_errors: AtomicU64::new(0),
            last_processing_us: AtomicU64::new(0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub messages_processed: u64,
    pub contracts_detected: u64,
    pub forwards_ok: u64,
    pub forward_errors: u64,
    pub last_processing_us: u64,
}

impl MetricsSnapshot {
    pub fn throughput_per_sec(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.messages_processed as f64 / secs
    }

    /// Share of forwards that succeeded, in percent (100 when nothing was sent).
    pub fn forward_success_rate(&self) -> f64 {
        let total = self.forwards_ok + self.forward_errors;
        if total == 0 {
            return 100.0;
        }
        self.forwards_ok as f64 * 100.0 / total as f64
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_message(&self, elapsed: Duration) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.last_processing_us.store(us, Ordering::Relaxed);
    }

    pub fn record_detection(&self) {
        self.contracts_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forwards(&self, ok: usize, failed: usize) {
        self.forwards_ok.fetch_add(ok as u64, Ordering::Relaxed);
        self.forward_errors.fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime: self.started.elapsed(),
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            contracts_detected: self.contracts_detected.load(Ordering::Relaxed),
            forwards_ok: self.forwards_ok.load(Ordering::Relaxed),
            forward_errors: self.forward_errors.load(Ordering::Relaxed),
            last_processing_us: self.last_processing_us.load(Ordering::Relaxed),
        }
    }
}

/// Log a metrics snapshot every `period` until cancelled.
pub async fn run_reporter(metrics: Arc<Metrics>, period: Duration, cancel: CancellationToken) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick fires immediately; skip it so the first report covers a full period.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                let s = metrics.snapshot();
                tracing::info!(
                    uptime_secs = s.uptime.as_secs(),
                    messages = s.messages_processed,
                    detected = s.contracts_detected,
                    forwards_ok = s.forwards_ok,
                    forward_errors = s.forward_errors,
                    last_processing_us = s.last_processing_us,
                    throughput_per_sec = s.throughput_per_sec(),
                    forward_success_pct = s.forward_success_rate(),
                    "metrics"
                );
            }
        }
    }
}
