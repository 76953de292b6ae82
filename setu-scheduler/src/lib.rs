//! Background task scheduler, trimmed from the teacher's full cron/
//! interval/delayed-task DSL down to the three periodic ticks spec.md §4.14
//! names: cache expired-entry sweep, analytics compaction, and per-source
//! pool health. Unlike the teacher's `Scheduler` plugin — which installs
//! itself into an `AppBuilder` and type-erases arbitrary `ScheduledTask`
//! impls discovered at controller-registration time — this scheduler has a
//! small, fixed set of ticks `setu-server` wires up explicitly at startup.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use chrono::Utc;
use setu_analytics::AnalyticsStore;
use setu_cache::Sweepable;
use setu_sources::SourcePoolRegistry;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub cache_sweep_interval: Duration,
    pub analytics_compaction_interval: Duration,
    pub analytics_retention: Duration,
    pub pool_health_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cache_sweep_interval: Duration::from_secs(30),
            analytics_compaction_interval: Duration::from_secs(3600),
            analytics_retention: Duration::from_secs(30 * 24 * 3600),
            pool_health_interval: Duration::from_secs(15),
        }
    }
}

/// Owns the cancellation token every spawned tick task watches. Dropping or
/// cancelling the handle stops all of them at the next tick boundary.
#[derive(Clone)]
pub struct Scheduler {
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { cancel: CancellationToken::new() }
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Periodically calls [`Sweepable::sweep`] on every registered cache.
    pub fn spawn_cache_sweep(&self, caches: Vec<Arc<dyn Sweepable>>, interval: Duration) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        for cache in &caches {
                            cache.sweep();
                        }
                    }
                }
            }
        })
    }

    /// Periodically deletes `QueryRecord`s older than `retention` (spec.md
    /// §4.12 "periodic compaction").
    pub fn spawn_analytics_compaction(
        &self,
        store: Arc<dyn AnalyticsStore>,
        interval: Duration,
        retention: Duration,
    ) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let cutoff = Utc::now() - chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::zero());
                        match store.compact_before(cutoff).await {
                            Ok(deleted) if deleted > 0 => {
                                tracing::info!(deleted, "compacted analytics store");
                            }
                            Ok(_) => {}
                            Err(err) => tracing::warn!(error = %err, "analytics compaction failed"),
                        }
                    }
                }
            }
        })
    }

    /// Periodically pings every registered source adapter and logs the
    /// ones that fail, so operators see a degraded upstream in logs before
    /// requests start timing out against it.
    pub fn spawn_pool_health(&self, sources: SourcePoolRegistry, interval: Duration) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        for (source_id, adapter) in sources.all() {
                            if let Err(err) = adapter.ping().await {
                                tracing::warn!(source_id, error = %err, "source pool health check failed");
                            }
                        }
                    }
                }
            }
        })
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingSweep(Arc<AtomicUsize>);

    impl Sweepable for CountingSweep {
        fn sweep(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn cache_sweep_ticks_until_cancelled() {
        let count = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new();
        let handle = scheduler.spawn_cache_sweep(
            vec![Arc::new(CountingSweep(Arc::clone(&count)))],
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(55)).await;
        scheduler.shutdown();
        handle.await.unwrap();

        assert!(count.load(Ordering::SeqCst) >= 2);
    }
}
