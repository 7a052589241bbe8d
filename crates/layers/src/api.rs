//! Remote data collaborator used by every layer and by the selection flow.
//!
//! The trait is object-safe (boxed futures) so the engine can hold a single
//! `Arc<dyn LayerApi>` constructed at startup and injected everywhere.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bridge::{AreaStat, FeatureCollection, MarkerRecord};
use foundation::{Period, Viewport, ZoomBand};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ApiErrorKind {
    Transport,
    Timeout,
    Status(u16),
    Decode,
}

/// Error type for remote data operations.
#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ApiErrorKind::Status(code) => write!(f, "{} (HTTP {code})", self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ApiErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// `/api/markers` query: bounding box plus paging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerQuery {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub limit: u32,
    pub offset: u32,
    pub period: &'static str,
}

impl MarkerQuery {
    pub fn new(viewport: &Viewport, limit: u32, period: Period) -> Self {
        Self {
            north: viewport.north,
            south: viewport.south,
            east: viewport.east,
            west: viewport.west,
            limit,
            offset: 0,
            period: period.as_str(),
        }
    }
}

/// Administrative level of a boundary polygon set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryLevel {
    Sido,
    Sgg,
    Emd,
}

impl BoundaryLevel {
    /// One level per area band; no polygons outside them.
    pub fn for_band(band: ZoomBand) -> Option<Self> {
        match band {
            ZoomBand::City => Some(BoundaryLevel::Sido),
            ZoomBand::District => Some(BoundaryLevel::Sgg),
            ZoomBand::Neighborhood => Some(BoundaryLevel::Emd),
            ZoomBand::Marker | ZoomBand::None => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryLevel::Sido => "sido",
            BoundaryLevel::Sgg => "sgg",
            BoundaryLevel::Emd => "emd",
        }
    }
}

/// `/api/bounds` query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundaryQuery {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    pub level: BoundaryLevel,
    pub zoom: i32,
}

impl BoundaryQuery {
    pub fn new(viewport: &Viewport, level: BoundaryLevel) -> Self {
        Self {
            west: viewport.west,
            south: viewport.south,
            east: viewport.east,
            north: viewport.north,
            level,
            zoom: viewport.zoom,
        }
    }
}

/// `/api/geo-summary` query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsQuery {
    pub scope: &'static str,
    pub period: &'static str,
}

/// `/api/summary` query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryQuery {
    pub scope: &'static str,
    pub period: &'static str,
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// Marker row as served remotely. Field names drifted between backend
/// revisions, so every known spelling is accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerRow {
    #[serde(default)]
    pub apt_cd: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub apt_nm: Option<String>,
    #[serde(default)]
    pub apt_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub rent_price: Option<f64>,
    #[serde(default)]
    pub sale_tx: Option<f64>,
    #[serde(default)]
    pub rent_tx: Option<f64>,
}

impl MarkerRow {
    /// Rows without a usable coordinate are dropped.
    pub fn into_record(self) -> Option<MarkerRecord> {
        let lat = self.lat.filter(|v| v.is_finite())?;
        let lng = self.lng.filter(|v| v.is_finite())?;
        let apt_cd = self
            .apt_cd
            .filter(|s| !s.is_empty())
            .or_else(|| match self.id {
                Some(Value::String(s)) => Some(s),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_default();
        let apt_nm = self
            .apt_nm
            .or(self.apt_name)
            .or(self.name)
            .unwrap_or_default();
        Some(MarkerRecord {
            apt_cd,
            apt_nm,
            lat,
            lng,
            sale_price: self.sale_price.unwrap_or(0.0),
            rent_price: self.rent_price.unwrap_or(0.0),
            sale_tx: self.sale_tx.unwrap_or(0.0),
            rent_tx: self.rent_tx.unwrap_or(0.0),
        })
    }
}

/// Area statistics row as served remotely; label point may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaStatRow {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub sale_med: Option<f64>,
    #[serde(default)]
    pub rent_med: Option<f64>,
    #[serde(default)]
    pub sale_tx: Option<f64>,
    #[serde(default)]
    pub rent_tx: Option<f64>,
}

impl AreaStatRow {
    pub fn into_stat(self) -> Option<AreaStat> {
        Some(AreaStat {
            code: self.code,
            name: self.name.unwrap_or_default(),
            lat: self.lat.filter(|v| v.is_finite())?,
            lng: self.lng.filter(|v| v.is_finite())?,
            sale_med: self.sale_med,
            rent_med: self.rent_med,
            sale_tx: self.sale_tx.unwrap_or(0.0),
            rent_tx: self.rent_tx.unwrap_or(0.0),
        })
    }
}

/// Headline figures for the current area band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub sale: f64,
    #[serde(default)]
    pub rent: f64,
    #[serde(default)]
    pub trades: f64,
}

/// Static facts about one apartment complex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AptBasic {
    #[serde(default)]
    pub apt_cd: Option<String>,
    #[serde(default)]
    pub apt_nm: Option<String>,
    #[serde(default)]
    pub apt_rdn_addr: Option<String>,
    #[serde(default)]
    pub whol_dong_cnt: Option<i64>,
    #[serde(default)]
    pub tnohsh: Option<i64>,
    #[serde(default)]
    pub use_aprv_ymd: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

/// Remote data endpoints.
///
/// Implementations must be `Send + Sync` for use across async tasks and must
/// enforce their own request timeout; a timeout is reported like any other
/// failure.
pub trait LayerApi: Send + Sync {
    fn markers(&self, query: MarkerQuery) -> BoxFuture<'_, Result<Vec<MarkerRow>, ApiError>>;

    fn boundaries(&self, query: BoundaryQuery) -> BoxFuture<'_, Result<FeatureCollection, ApiError>>;

    fn geo_summary(&self, query: StatsQuery) -> BoxFuture<'_, Result<Vec<AreaStatRow>, ApiError>>;

    fn summary(&self, query: SummaryQuery) -> BoxFuture<'_, Result<Summary, ApiError>>;

    fn apartment_basic(&self, apt_cd: String) -> BoxFuture<'_, Result<AptBasic, ApiError>>;
}
