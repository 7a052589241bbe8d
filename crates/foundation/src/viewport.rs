use std::fmt;

use crate::zoom::{ZoomBand, classify};

/// Lowest zoom the rendering surface reports.
pub const MIN_ZOOM: i32 = 0;
/// Highest zoom the rendering surface reports.
pub const MAX_ZOOM: i32 = 22;

/// Visible map area plus integer zoom.
///
/// Built once per pan/zoom settle and never mutated; a new view is a new value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub zoom: i32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ViewportError {
    NonFinite,
    LatitudeInverted { north: f64, south: f64 },
    LongitudeInverted { east: f64, west: f64 },
    ZoomOutOfRange(i32),
}

impl fmt::Display for ViewportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewportError::NonFinite => write!(f, "viewport has a non-finite coordinate"),
            ViewportError::LatitudeInverted { north, south } => {
                write!(f, "viewport north {north} is below south {south}")
            }
            ViewportError::LongitudeInverted { east, west } => {
                write!(f, "viewport east {east} is west of {west}")
            }
            ViewportError::ZoomOutOfRange(z) => {
                write!(f, "zoom {z} outside {MIN_ZOOM}..={MAX_ZOOM}")
            }
        }
    }
}

impl std::error::Error for ViewportError {}

impl Viewport {
    pub fn new(north: f64, south: f64, east: f64, west: f64, zoom: i32) -> Result<Self, ViewportError> {
        if ![north, south, east, west].iter().all(|v| v.is_finite()) {
            return Err(ViewportError::NonFinite);
        }
        if north < south {
            return Err(ViewportError::LatitudeInverted { north, south });
        }
        if east < west {
            return Err(ViewportError::LongitudeInverted { east, west });
        }
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
            return Err(ViewportError::ZoomOutOfRange(zoom));
        }
        Ok(Self {
            north,
            south,
            east,
            west,
            zoom,
        })
    }

    pub fn band(&self) -> ZoomBand {
        classify(self.zoom)
    }

    /// Inclusive containment test for a point.
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat <= self.north && lat >= self.south && lng <= self.east && lng >= self.west
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.north + self.south) / 2.0, (self.east + self.west) / 2.0)
    }
}
