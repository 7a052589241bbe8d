use std::sync::Arc;

use foundation::Period;
use parking_lot::RwLock;

/// User-controlled inputs that affect what layers fetch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ControlState {
    pub period: Period,
    pub boundaries_enabled: bool,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            period: Period::default(),
            boundaries_enabled: true,
        }
    }
}

/// Shared handle to [`ControlState`]. Layer tasks take a snapshot when a
/// viewport settles; writers are the engine's control operations.
#[derive(Debug, Clone, Default)]
pub struct Controls(Arc<RwLock<ControlState>>);

impl Controls {
    pub fn new(initial: ControlState) -> Self {
        Self(Arc::new(RwLock::new(initial)))
    }

    pub fn snapshot(&self) -> ControlState {
        *self.0.read()
    }

    /// Returns whether the value changed.
    pub fn set_period(&self, period: Period) -> bool {
        let mut state = self.0.write();
        let changed = state.period != period;
        state.period = period;
        changed
    }

    /// Returns whether the value changed.
    pub fn set_boundaries_enabled(&self, enabled: bool) -> bool {
        let mut state = self.0.write();
        let changed = state.boundaries_enabled != enabled;
        state.boundaries_enabled = enabled;
        changed
    }
}
