use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::Result;

/// A cheap round-trip to the chat service that keeps the session warm.
#[async_trait]
pub trait Heartbeat: Send + Sync {
    async fn ping(&self) -> Result<()>;
}

/// Ping every `period` until cancelled.
///
/// Failures are logged and never end the loop; the next tick tries again.
/// Returns how many pings succeeded.
pub async fn run_heartbeat(
    port: Arc<dyn Heartbeat>,
    period: Duration,
    cancel: CancellationToken,
) -> u64 {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ok = 0u64;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return ok,
            _ = ticker.tick() => {
                match port.ping().await {
                    Ok(()) => {
                        ok += 1;
                        tracing::debug!("heartbeat ok");
                    }
                    Err(e) => tracing::warn!("heartbeat failed: {e}"),
                }
            }
        }
    }
}
