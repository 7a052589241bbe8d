//! A scripted [`LayerApi`] for tests. Records every call and answers from
//! canned responses, optionally after a simulated latency.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use bridge::FeatureCollection;
use parking_lot::Mutex;

use crate::api::{
    ApiError, ApiErrorKind, AptBasic, AreaStatRow, BoundaryQuery, BoxFuture, LayerApi,
    MarkerQuery, MarkerRow, StatsQuery, Summary, SummaryQuery,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Markers(MarkerQuery),
    Boundaries(BoundaryQuery),
    GeoSummary(StatsQuery),
    Summary(SummaryQuery),
    AptBasic(String),
}

type Canned<T> = Result<T, ApiErrorKind>;

struct Script {
    markers: Canned<Vec<MarkerRow>>,
    boundaries: Canned<FeatureCollection>,
    geo_summary: Canned<Vec<AreaStatRow>>,
    summary: Canned<Summary>,
    details: HashMap<String, Canned<AptBasic>>,
    latencies: VecDeque<Duration>,
    calls: Vec<ApiCall>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            markers: Ok(Vec::new()),
            boundaries: Ok(FeatureCollection::empty()),
            geo_summary: Ok(Vec::new()),
            summary: Ok(Summary::default()),
            details: HashMap::new(),
            latencies: VecDeque::new(),
            calls: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct FakeApi {
    script: Mutex<Script>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_markers(&self, response: Canned<Vec<MarkerRow>>) {
        self.script.lock().markers = response;
    }

    pub fn set_boundaries(&self, response: Canned<FeatureCollection>) {
        self.script.lock().boundaries = response;
    }

    pub fn set_geo_summary(&self, response: Canned<Vec<AreaStatRow>>) {
        self.script.lock().geo_summary = response;
    }

    pub fn set_summary(&self, response: Canned<Summary>) {
        self.script.lock().summary = response;
    }

    /// Detail for one complex. Unknown codes answer 404.
    pub fn set_detail(&self, apt_cd: &str, response: Canned<AptBasic>) {
        self.script
            .lock()
            .details
            .insert(apt_cd.to_string(), response);
    }

    /// Latency for the next call, in call order. Calls beyond the queue
    /// answer immediately.
    pub fn push_latency(&self, latency: Duration) {
        self.script.lock().latencies.push_back(latency);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.script.lock().calls.clone()
    }

    fn answer<T: Send + 'static>(
        &self,
        call: ApiCall,
        pick: impl FnOnce(&Script) -> Canned<T>,
    ) -> BoxFuture<'_, Result<T, ApiError>> {
        let (latency, response) = {
            let mut script = self.script.lock();
            script.calls.push(call);
            let latency = script.latencies.pop_front();
            (latency, pick(&script))
        };
        Box::pin(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            response.map_err(|kind| ApiError::new(kind, "scripted failure"))
        })
    }
}

impl LayerApi for FakeApi {
    fn markers(&self, query: MarkerQuery) -> BoxFuture<'_, Result<Vec<MarkerRow>, ApiError>> {
        self.answer(ApiCall::Markers(query), |s| s.markers.clone())
    }

    fn boundaries(&self, query: BoundaryQuery) -> BoxFuture<'_, Result<FeatureCollection, ApiError>> {
        self.answer(ApiCall::Boundaries(query), |s| s.boundaries.clone())
    }

    fn geo_summary(&self, query: StatsQuery) -> BoxFuture<'_, Result<Vec<AreaStatRow>, ApiError>> {
        self.answer(ApiCall::GeoSummary(query), |s| s.geo_summary.clone())
    }

    fn summary(&self, query: SummaryQuery) -> BoxFuture<'_, Result<Summary, ApiError>> {
        self.answer(ApiCall::Summary(query), |s| s.summary.clone())
    }

    fn apartment_basic(&self, apt_cd: String) -> BoxFuture<'_, Result<AptBasic, ApiError>> {
        let key = apt_cd.clone();
        self.answer(ApiCall::AptBasic(apt_cd), move |s| {
            s.details
                .get(&key)
                .cloned()
                .unwrap_or(Err(ApiErrorKind::Status(404)))
        })
    }
}
