//! Semantic zoom bands.
//!
//! Every layer that gates on zoom goes through [`classify`], so all overlays
//! agree on where one band ends and the next begins.

use std::fmt;
use std::ops::RangeInclusive;

/// City outline (sido) is shown at exactly this zoom.
pub const CITY_ZOOM: i32 = 11;
/// District (sgg) polygons and stats.
pub const DISTRICT_ZOOM: RangeInclusive<i32> = 12..=13;
/// Neighborhood (emd) polygons and stats.
pub const NEIGHBORHOOD_ZOOM: RangeInclusive<i32> = 14..=16;
/// Point markers from here up.
pub const MARKER_MIN_ZOOM: i32 = 17;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ZoomBand {
    City,
    District,
    Neighborhood,
    Marker,
    /// Dead zone: no area overlay and no markers.
    None,
}

/// Maps a zoom level to its band. Total over `i32`.
pub fn classify(zoom: i32) -> ZoomBand {
    if zoom == CITY_ZOOM {
        ZoomBand::City
    } else if DISTRICT_ZOOM.contains(&zoom) {
        ZoomBand::District
    } else if NEIGHBORHOOD_ZOOM.contains(&zoom) {
        ZoomBand::Neighborhood
    } else if zoom >= MARKER_MIN_ZOOM {
        ZoomBand::Marker
    } else {
        ZoomBand::None
    }
}

impl ZoomBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoomBand::City => "city",
            ZoomBand::District => "sgg",
            ZoomBand::Neighborhood => "emd",
            ZoomBand::Marker => "marker",
            ZoomBand::None => "none",
        }
    }

    /// The administrative scope name used by area queries, if this is an area band.
    pub fn scope(&self) -> Option<&'static str> {
        match self {
            ZoomBand::City | ZoomBand::District | ZoomBand::Neighborhood => Some(self.as_str()),
            ZoomBand::Marker | ZoomBand::None => None,
        }
    }

    pub fn is_area(&self) -> bool {
        self.scope().is_some()
    }
}

impl fmt::Display for ZoomBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_match_band_table() {
        assert_eq!(classify(10), ZoomBand::None);
        assert_eq!(classify(11), ZoomBand::City);
        assert_eq!(classify(12), ZoomBand::District);
        assert_eq!(classify(13), ZoomBand::District);
        assert_eq!(classify(14), ZoomBand::Neighborhood);
        assert_eq!(classify(16), ZoomBand::Neighborhood);
        assert_eq!(classify(17), ZoomBand::Marker);
        assert_eq!(classify(22), ZoomBand::Marker);
    }

    #[test]
    fn total_and_stable_over_wide_range() {
        for z in -50..=50 {
            let band = classify(z);
            assert_eq!(band, classify(z), "classify must be pure for z={z}");
            if z < CITY_ZOOM {
                assert_eq!(band, ZoomBand::None);
            }
        }
        assert_eq!(classify(i32::MIN), ZoomBand::None);
        assert_eq!(classify(i32::MAX), ZoomBand::Marker);
    }

    #[test]
    fn scope_only_for_area_bands() {
        assert_eq!(ZoomBand::City.scope(), Some("city"));
        assert_eq!(ZoomBand::District.scope(), Some("sgg"));
        assert_eq!(ZoomBand::Neighborhood.scope(), Some("emd"));
        assert!(!ZoomBand::Marker.is_area());
        assert!(!ZoomBand::None.is_area());
    }
}
