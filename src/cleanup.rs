//! Background sweep of expired cache entries and elapsed rate windows.
//!
//! The sweep runs on its own timer, independent of request traffic. It
//! takes the same locks as `get`/`put`/`allow`, so it cannot race a
//! concurrent request.

use ink_router_core::{PipelineResult, RateLimiter, ResponseCache};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired_entries: usize,
    pub pruned_windows: usize,
}

/// Run a single sweep.
pub fn sweep(cache: &ResponseCache<PipelineResult>, limiter: &RateLimiter) -> SweepReport {
    let report = SweepReport {
        expired_entries: cache.cleanup(),
        pruned_windows: limiter.prune(),
    };
    if report.expired_entries > 0 || report.pruned_windows > 0 {
        debug!(
            expired_entries = report.expired_entries,
            pruned_windows = report.pruned_windows,
            "cleanup sweep"
        );
    }
    report
}

/// Spawn the periodic sweep. Abort the handle to stop it.
pub fn spawn_cleanup(
    cache: Arc<ResponseCache<PipelineResult>>,
    limiter: Arc<RateLimiter>,
    interval: Duration,
) -> JoinHandle<()> {
    info!("Starting cache cleanup (interval: {:?})", interval);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep(&cache, &limiter);
        }
    })
}
