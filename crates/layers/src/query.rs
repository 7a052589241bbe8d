use std::fmt;

use foundation::{Period, Viewport};

/// Identifies "the same question" for a layer, so an unchanged view is not
/// fetched twice. Coordinates are rounded to three decimals (~100 m).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerQueryKey(String);

impl LayerQueryKey {
    /// `scope:period:zoom:north:west`, `-` standing in for a missing period.
    pub fn new(scope: &str, period: Option<Period>, viewport: &Viewport) -> Self {
        let period = period.map_or("-", |p| p.as_str());
        Self(format!(
            "{scope}:{period}:{}:{:.3}:{:.3}",
            viewport.zoom, viewport.north, viewport.west
        ))
    }

    /// Also key on the south-east corner, for layers whose query is the full box.
    pub fn with_extent(mut self, viewport: &Viewport) -> Self {
        self.0
            .push_str(&format!(":{:.3}:{:.3}", viewport.south, viewport.east));
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerQueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
