//! Message vocabulary between the host and the rendering surface.
//!
//! Both directions use the same envelope: `{"type": <tag>, "payload": <value>}`.
//! Inbound parsing is permissive: unknown tags are ignored so an older host
//! keeps working against a newer surface, and malformed frames are reported
//! to the caller instead of tearing down the session.

use std::fmt;
use std::str::FromStr;

use foundation::{Viewport, ViewportError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::payload::{AreaStat, FeatureCollection, MarkerClick, MarkerRecord, SurfaceFault};

/// Surface → host.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Surface finished initializing.
    Ready,
    /// Pan/zoom settled. Already validated.
    Bounds(Viewport),
    MarkerClick(MarkerClick),
    /// Non-fatal fault inside the surface.
    WvError(SurfaceFault),
}

/// Raw `bounds` payload. Zoom may be fractional on some surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsPayload {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub zoom: f64,
}

impl BoundsPayload {
    pub fn into_viewport(self) -> Result<Viewport, ViewportError> {
        if !self.zoom.is_finite() {
            return Err(ViewportError::NonFinite);
        }
        Viewport::new(
            self.north,
            self.south,
            self.east,
            self.west,
            self.zoom.floor() as i32,
        )
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug)]
pub enum BridgeError {
    Malformed(serde_json::Error),
    InvalidViewport(ViewportError),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::Malformed(e) => write!(f, "malformed bridge message: {e}"),
            BridgeError::InvalidViewport(e) => write!(f, "invalid bounds payload: {e}"),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BridgeError::Malformed(e) => Some(e),
            BridgeError::InvalidViewport(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Malformed(e)
    }
}

impl From<ViewportError> for BridgeError {
    fn from(e: ViewportError) -> Self {
        BridgeError::InvalidViewport(e)
    }
}

impl InboundMessage {
    /// Parse one text frame.
    ///
    /// `Ok(None)` means a well-formed envelope with a tag this host does not
    /// know. Frames that are a JSON string wrapping the envelope are unwrapped.
    pub fn parse(text: &str) -> Result<Option<Self>, BridgeError> {
        let mut value: Value = serde_json::from_str(text)?;
        if let Some(inner) = value.as_str().map(str::to_owned) {
            value = serde_json::from_str(&inner)?;
        }
        let Envelope { kind, payload } = serde_json::from_value(value)?;

        let msg = match kind.as_str() {
            "ready" => InboundMessage::Ready,
            "bounds" => {
                let raw: BoundsPayload = serde_json::from_value(payload)?;
                InboundMessage::Bounds(raw.into_viewport()?)
            }
            "markerClick" => {
                let click = if payload.is_null() {
                    MarkerClick::default()
                } else {
                    serde_json::from_value(payload)?
                };
                InboundMessage::MarkerClick(click)
            }
            "wvError" => InboundMessage::WvError(SurfaceFault(payload)),
            _ => return Ok(None),
        };
        Ok(Some(msg))
    }

    /// [`InboundMessage::parse`] with failures logged and swallowed.
    pub fn decode(text: &str) -> Option<Self> {
        match Self::parse(text) {
            Ok(Some(msg)) => Some(msg),
            Ok(None) => {
                debug!(frame = %truncate(text, 120), "ignoring bridge message with unknown type");
                None
            }
            Err(e) => {
                warn!(frame = %truncate(text, 120), "dropping bridge message: {e}");
                None
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Ready => "ready",
            InboundMessage::Bounds(_) => "bounds",
            InboundMessage::MarkerClick(_) => "markerClick",
            InboundMessage::WvError(_) => "wvError",
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Base tile source on the surface.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseMode {
    #[default]
    Base,
    Sat,
    Osm,
}

impl FromStr for BaseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base" => Ok(BaseMode::Base),
            "sat" | "satellite" => Ok(BaseMode::Sat),
            "osm" => Ok(BaseMode::Osm),
            other => Err(format!("unknown base mode {other:?}")),
        }
    }
}

/// Default zoom for `moveTo` when the caller does not pick one.
pub const MOVE_TO_DEFAULT_ZOOM: i32 = 16;

/// Host → surface render commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum OutboundMessage {
    ShowPlaces(Vec<MarkerRecord>),
    ClearPlaces,
    ShowSido(FeatureCollection),
    ShowSgg(FeatureCollection),
    ShowEmd(FeatureCollection),
    ClearBounds,
    ShowStats(Vec<AreaStat>),
    ClearStats,
    MoveTo { lat: f64, lng: f64, zoom: i32 },
    SwitchBase(BaseMode),
    ResetSeoul,
    CardsToggle(bool),
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::ShowPlaces(_) => "showPlaces",
            OutboundMessage::ClearPlaces => "clearPlaces",
            OutboundMessage::ShowSido(_) => "showSido",
            OutboundMessage::ShowSgg(_) => "showSgg",
            OutboundMessage::ShowEmd(_) => "showEmd",
            OutboundMessage::ClearBounds => "clearBounds",
            OutboundMessage::ShowStats(_) => "showStats",
            OutboundMessage::ClearStats => "clearStats",
            OutboundMessage::MoveTo { .. } => "moveTo",
            OutboundMessage::SwitchBase(_) => "switchBase",
            OutboundMessage::ResetSeoul => "resetSeoul",
            OutboundMessage::CardsToggle(_) => "cardsToggle",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_bounds_and_floors_zoom() {
        let msg = InboundMessage::parse(
            r#"{"type":"bounds","payload":{"north":37.7,"south":37.4,"east":127.2,"west":126.8,"zoom":14.6}}"#,
        )
        .unwrap();
        let Some(InboundMessage::Bounds(v)) = msg else {
            panic!("expected bounds");
        };
        assert_eq!(v.zoom, 14);
        assert_eq!(v.north, 37.7);
    }

    #[test]
    fn ready_needs_no_payload() {
        assert_eq!(
            InboundMessage::parse(r#"{"type":"ready"}"#).unwrap(),
            Some(InboundMessage::Ready)
        );
    }

    #[test]
    fn unwraps_double_encoded_frames() {
        let inner = json!({"type": "markerClick", "payload": {"apt_cd": "A1", "apt_nm": "Tower"}});
        let frame = serde_json::to_string(&inner.to_string()).unwrap();
        let Some(InboundMessage::MarkerClick(click)) = InboundMessage::parse(&frame).unwrap()
        else {
            panic!("expected markerClick");
        };
        assert_eq!(click.entity_id().as_deref(), Some("A1"));
    }

    #[test]
    fn unknown_tags_are_ignored_not_errors() {
        assert_eq!(
            InboundMessage::parse(r#"{"type":"zoomHint","payload":3}"#).unwrap(),
            None
        );
        assert_eq!(InboundMessage::decode(r#"{"type":"zoomHint"}"#), None);
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(matches!(
            InboundMessage::parse("{not json"),
            Err(BridgeError::Malformed(_))
        ));
        assert!(matches!(
            InboundMessage::parse(r#"{"payload":{}}"#),
            Err(BridgeError::Malformed(_))
        ));
        assert!(matches!(
            InboundMessage::parse(
                r#"{"type":"bounds","payload":{"north":1,"south":2,"east":3,"west":0,"zoom":12}}"#
            ),
            Err(BridgeError::InvalidViewport(_))
        ));
        assert_eq!(InboundMessage::decode("[]"), None);
    }

    #[test]
    fn wv_error_keeps_diagnostics() {
        let Some(InboundMessage::WvError(fault)) =
            InboundMessage::parse(r#"{"type":"wvError","payload":{"msg":"onMsgFail"}}"#).unwrap()
        else {
            panic!("expected wvError");
        };
        assert_eq!(fault.summary(), "onMsgFail");
    }

    #[test]
    fn outbound_wire_shapes() {
        assert_eq!(
            serde_json::to_value(OutboundMessage::ClearPlaces).unwrap(),
            json!({"type": "clearPlaces"})
        );
        assert_eq!(
            serde_json::to_value(OutboundMessage::MoveTo {
                lat: 37.5,
                lng: 127.0,
                zoom: MOVE_TO_DEFAULT_ZOOM
            })
            .unwrap(),
            json!({"type": "moveTo", "payload": {"lat": 37.5, "lng": 127.0, "zoom": 16}})
        );
        assert_eq!(
            serde_json::to_value(OutboundMessage::SwitchBase(BaseMode::Sat)).unwrap(),
            json!({"type": "switchBase", "payload": "sat"})
        );
        assert_eq!(
            serde_json::to_value(OutboundMessage::CardsToggle(false)).unwrap(),
            json!({"type": "cardsToggle", "payload": false})
        );
        assert_eq!(
            serde_json::to_value(OutboundMessage::ShowSido(FeatureCollection::empty())).unwrap(),
            json!({"type": "showSido", "payload": {"type": "FeatureCollection", "features": []}})
        );
    }
}
