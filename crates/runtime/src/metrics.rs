use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Per-layer synchronization events worth counting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SyncEvent {
    FetchStarted,
    FetchApplied,
    FetchCancelled,
    FetchFailed,
    DedupSkipped,
    GatedClear,
    EmptyClear,
}

impl SyncEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncEvent::FetchStarted => "fetch_started",
            SyncEvent::FetchApplied => "fetch_applied",
            SyncEvent::FetchCancelled => "fetch_cancelled",
            SyncEvent::FetchFailed => "fetch_failed",
            SyncEvent::DedupSkipped => "dedup_skipped",
            SyncEvent::GatedClear => "gated_clear",
            SyncEvent::EmptyClear => "empty_clear",
        }
    }
}

/// Deterministic counters keyed by `(layer, event)`.
///
/// Sorted maps keep snapshots stable regardless of arrival order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<(&'static str, SyncEvent), u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, layer: &'static str, event: SyncEvent) {
        *self.counters.entry((layer, event)).or_insert(0) += 1;
    }

    pub fn count(&self, layer: &str, event: SyncEvent) -> u64 {
        self.counters
            .iter()
            .find(|((l, e), _)| *l == layer && *e == event)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// `("layer.event", count)` pairs in stable order.
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        self.counters
            .iter()
            .map(|((layer, event), n)| (format!("{layer}.{}", event.as_str()), *n))
            .collect()
    }
}

/// Cloneable handle shared by every layer task.
#[derive(Debug, Default, Clone)]
pub struct SharedMetrics(Arc<Mutex<Metrics>>);

impl SharedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, layer: &'static str, event: SyncEvent) {
        self.0.lock().record(layer, event);
    }

    pub fn count(&self, layer: &str, event: SyncEvent) -> u64 {
        self.0.lock().count(layer, event)
    }

    pub fn snapshot(&self) -> Vec<(String, u64)> {
        self.0.lock().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::{Metrics, SharedMetrics, SyncEvent};

    #[test]
    fn counts_per_layer() {
        let mut m = Metrics::new();
        m.record("markers", SyncEvent::FetchStarted);
        m.record("markers", SyncEvent::FetchStarted);
        m.record("bounds", SyncEvent::GatedClear);
        assert_eq!(m.count("markers", SyncEvent::FetchStarted), 2);
        assert_eq!(m.count("bounds", SyncEvent::FetchStarted), 0);
    }

    #[test]
    fn snapshot_is_sorted() {
        let m = SharedMetrics::new();
        m.record("stats", SyncEvent::DedupSkipped);
        m.record("bounds", SyncEvent::FetchApplied);
        m.record("bounds", SyncEvent::FetchStarted);
        let names: Vec<String> = m.snapshot().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            names,
            vec![
                "bounds.fetch_started".to_string(),
                "bounds.fetch_applied".to_string(),
                "stats.dedup_skipped".to_string(),
            ]
        );
    }
}
