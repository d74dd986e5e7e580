//! Session lifecycle sweeper.
//!
//! Periodically evicts sessions that have gone silent, treating each as an
//! explicit leave: the partner is notified and re-queued, the registry
//! entry and outbox are reclaimed. A session that becomes active between
//! the snapshot and its eviction is left alone (the staleness re-check
//! happens under the registry lock).

use crate::state::Hub;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Spawn the background sweep task.
///
/// Runs forever on `interval`; a pass over an empty registry is a no-op.
/// Individual sessions that vanish mid-pass are skipped, never fatal, so
/// the task cannot halt on a single bad session.
pub fn spawn_sweeper_task(hub: Arc<Hub>, interval: Duration, stale_after: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;
            let swept = hub.sweep(stale_after);
            if swept > 0 {
                info!(swept, "Sweep pass evicted stale sessions");
            }
        }
    });
}
