use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use super::Inner;

/// Periodically evict terminal submissions older than the retention window.
pub(crate) async fn run(inner: Arc<Inner>) {
    let scan_interval = inner.config.retention_scan_interval();
    let Ok(retention) = chrono::Duration::from_std(inner.config.retention()) else {
        error!(
            retention_secs = inner.config.retention_secs,
            "Retention window out of range, eviction disabled"
        );
        return;
    };

    info!(
        retention_secs = inner.config.retention_secs,
        scan_interval_secs = scan_interval.as_secs(),
        "Starting retention sweeper"
    );

    let mut interval = tokio::time::interval(scan_interval);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = inner.shutdown.cancelled() => break,
        }

        let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
            continue;
        };
        let evicted = inner.store().evict_finished_before(cutoff);
        if evicted > 0 {
            info!(count = evicted, "Evicted expired submissions");
        }
    }
}
