use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::manager::CacheManager;

/// How often the background sweep runs by default.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Background expiry sweep. The task stops when the handle is dropped.
#[derive(Debug)]
pub struct SweeperHandle {
    handle: JoinHandle<()>,
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.handle.abort();
        debug!("Cache sweeper stopped");
    }
}

impl CacheManager {
    /// Run `clear_expired` every `period` on the current tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> SweeperHandle {
        let cache = Arc::clone(self);
        info!(period_secs = period.as_secs(), "Starting cache sweeper");
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                let report = cache.clear_expired();
                debug!(removed = report.total(), "Periodic cache sweep");
            }
        });
        SweeperHandle { handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::clock::ManualClock;
    use chrono::Utc;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_periodically_until_dropped() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = Arc::new(CacheManager::with_clock(
            Arc::new(MemoryStore::new()),
            clock.clone(),
        ));
        cache.set("k", &1, Some(chrono::Duration::seconds(1)));
        clock.advance(chrono::Duration::seconds(2));

        let sweeper = cache.spawn_sweeper(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(cache.stats().memory_entries, 0);

        drop(sweeper);
        cache.set("j", &1, Some(chrono::Duration::seconds(1)));
        clock.advance(chrono::Duration::seconds(2));
        tokio::time::sleep(Duration::from_secs(120)).await;
        // Sweeper is gone, so the expired entry is still physically present
        assert_eq!(cache.stats().memory_entries, 1);
    }
}
