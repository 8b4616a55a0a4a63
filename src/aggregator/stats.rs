use std::sync::atomic::{AtomicU64, Ordering};

/// Lightweight ambient observability counters for the running engine.
#[derive(Debug, Default)]
pub struct EngineStats {
    stale_events_dropped: AtomicU64,
    events_applied: AtomicU64,
    views_published: AtomicU64,
}

/// A point-in-time snapshot of [`EngineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStatsSnapshot {
    pub stale_events_dropped: u64,
    pub events_applied: u64,
    pub views_published: u64,
}

impl EngineStats {
    pub(super) fn record_applied(&self) {
        self.events_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_stale(&self) {
        self.stale_events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn record_published(&self) {
        self.views_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            stale_events_dropped: self.stale_events_dropped.load(Ordering::Relaxed),
            events_applied: self.events_applied.load(Ordering::Relaxed),
            views_published: self.views_published.load(Ordering::Relaxed),
        }
    }
}
