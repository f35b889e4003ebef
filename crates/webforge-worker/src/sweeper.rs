// Session sweeper
//
// Completed build sessions stay in the registry so clients can reconnect and
// replay them. This task drops the ones that finished more than `ttl` ago.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use webforge_core::BuildStream;

/// tokio intervals must have a non-zero period
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Spawn a task that evicts expired sessions every `interval`
pub fn spawn_session_sweeper(
    stream: Arc<BuildStream>,
    ttl: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    let interval = if interval < MIN_SWEEP_INTERVAL {
        warn!(?interval, "Sweep interval too small, using {MIN_SWEEP_INTERVAL:?}");
        MIN_SWEEP_INTERVAL
    } else {
        interval
    };
    info!(
        ttl_secs = ttl.as_secs(),
        interval_secs = interval.as_secs(),
        "Starting build session sweeper"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = stream.evict_expired(ttl);
            debug!(evicted, remaining = stream.len(), "Session sweep finished");
        }
    })
}
