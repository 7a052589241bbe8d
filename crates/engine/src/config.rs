use std::time::Duration;

use foundation::Period;
use layers::DEFAULT_MARKER_LIMIT;

/// Tuning for the layer tasks. The host fills this from its environment.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub markers_debounce: Duration,
    pub boundaries_debounce: Duration,
    pub stats_debounce: Duration,
    pub summary_debounce: Duration,
    pub marker_limit: u32,
    /// Gates the summary layer; off when the data API has no `/api/summary`.
    pub stats_enabled: bool,
    pub period: Period,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            markers_debounce: Duration::from_millis(300),
            boundaries_debounce: Duration::from_millis(600),
            stats_debounce: Duration::from_millis(300),
            summary_debounce: Duration::from_millis(300),
            marker_limit: DEFAULT_MARKER_LIMIT,
            stats_enabled: false,
            period: Period::default(),
        }
    }
}
