//! Payload records carried by bridge messages.
//!
//! Only the fields the host reads for keying, filtering, or rendering are
//! modelled; everything else in a remote response is passed through or dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One point marker as the rendering surface draws it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub apt_cd: String,
    pub apt_nm: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub sale_price: f64,
    #[serde(default)]
    pub rent_price: f64,
    #[serde(default)]
    pub sale_tx: f64,
    #[serde(default)]
    pub rent_tx: f64,
}

/// Aggregated statistics for one district or neighborhood, anchored at a label point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaStat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub sale_med: Option<f64>,
    #[serde(default)]
    pub rent_med: Option<f64>,
    #[serde(default)]
    pub sale_tx: f64,
    #[serde(default)]
    pub rent_tx: f64,
}

/// GeoJSON FeatureCollection kept opaque apart from its feature count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureCollection(pub Value);

impl FeatureCollection {
    pub fn empty() -> Self {
        Self(serde_json::json!({ "type": "FeatureCollection", "features": [] }))
    }

    /// Missing or non-array `features` counts as zero.
    pub fn feature_count(&self) -> usize {
        self.0
            .get("features")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.feature_count() == 0
    }
}

/// Raw `markerClick` payload. The identifier has historically been sent
/// under several names; see [`MarkerClick::entity_id`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerClick {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apt_cd: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, rename = "aptId", skip_serializing_if = "Option::is_none")]
    pub apt_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apt_nm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl MarkerClick {
    /// First non-empty of `apt_cd`, `id`, `aptId`. Numeric ids are stringified.
    pub fn entity_id(&self) -> Option<String> {
        [self.apt_cd.as_ref(), self.id.as_ref(), self.apt_id.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }

    pub fn display_name(&self) -> Option<&str> {
        [self.apt_nm.as_deref(), self.title.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
    }
}

/// Diagnostic blob from a `wvError` message. Logged, never acted upon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceFault(pub Value);

impl SurfaceFault {
    pub fn summary(&self) -> &str {
        self.0.get("msg").and_then(Value::as_str).unwrap_or("unspecified")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn feature_count_tolerates_shape_drift() {
        assert_eq!(FeatureCollection::empty().feature_count(), 0);
        assert_eq!(FeatureCollection(json!({})).feature_count(), 0);
        assert_eq!(FeatureCollection(json!({"features": "x"})).feature_count(), 0);
        let fc = FeatureCollection(json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature"}, {"type": "Feature"}]
        }));
        assert_eq!(fc.feature_count(), 2);
        assert!(!fc.is_empty());
    }

    #[test]
    fn entity_id_falls_back_through_known_names() {
        let click: MarkerClick = serde_json::from_value(json!({"apt_cd": "A1"})).unwrap();
        assert_eq!(click.entity_id().as_deref(), Some("A1"));

        let click: MarkerClick =
            serde_json::from_value(json!({"apt_cd": "", "id": 42, "title": "Tower"})).unwrap();
        assert_eq!(click.entity_id().as_deref(), Some("42"));
        assert_eq!(click.display_name(), Some("Tower"));

        let click: MarkerClick = serde_json::from_value(json!({"aptId": "B7"})).unwrap();
        assert_eq!(click.entity_id().as_deref(), Some("B7"));

        let click: MarkerClick = serde_json::from_value(json!({"apt_nm": "x"})).unwrap();
        assert_eq!(click.entity_id(), None);
    }

    #[test]
    fn numeric_apt_cd_is_accepted() {
        let click: MarkerClick =
            serde_json::from_value(json!({"apt_cd": 12345, "apt_nm": "Raemian"})).unwrap();
        assert_eq!(click.entity_id().as_deref(), Some("12345"));
        assert_eq!(click.display_name(), Some("Raemian"));

        let msg = crate::InboundMessage::parse(
            r#"{"type":"markerClick","payload":{"apt_cd":12345}}"#,
        )
        .unwrap();
        let Some(crate::InboundMessage::MarkerClick(click)) = msg else {
            panic!("expected a marker click, got {msg:?}");
        };
        assert_eq!(click.entity_id().as_deref(), Some("12345"));
    }

    #[test]
    fn area_stat_defaults_missing_counts() {
        let s: AreaStat =
            serde_json::from_value(json!({"name": "Gangnam", "lat": 37.5, "lng": 127.0})).unwrap();
        assert_eq!(s.sale_tx, 0.0);
        assert_eq!(s.sale_med, None);
    }
}
