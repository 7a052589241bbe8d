//! The per-layer fetch-and-apply pipeline.
//!
//! Each layer runs as its own task with a private state record
//! (`debounce`, `pending`, `last_applied`). Viewports come in through a
//! [`LayerHandle`]; the task coalesces them, gates, dedups, cancels the
//! superseded request, and applies the result:
//!
//! ```text
//! Idle -> Debouncing -> (Gated-Clear | Fetching) -> Idle
//!                                      Fetching -> Cancelled -> Idle
//!                                      Fetching -> Applied   -> Idle
//! ```
//!
//! Only this task mutates its state, so two invocations never race.
//!
//! `last_applied` is scoped to the surface session that received the
//! result. A reconnected surface starts blank, so it never matches.

use std::sync::Arc;
use std::time::Duration;

use foundation::Viewport;
use runtime::{Completion, Debouncer, PendingSlot, SharedMetrics, SyncEvent};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{ApiError, LayerApi};
use crate::controls::Controls;
use crate::layer::{Layer, LayerContext, LayerKind, LayerOutputs};
use crate::query::LayerQueryKey;

/// Collaborators shared by every layer task.
#[derive(Clone)]
pub struct SyncDeps {
    pub api: Arc<dyn LayerApi>,
    pub controls: Controls,
    pub outputs: LayerOutputs,
    pub metrics: SharedMetrics,
}

/// Sending side of a layer task's inbox.
#[derive(Debug, Clone)]
pub struct LayerHandle {
    kind: LayerKind,
    tx: mpsc::UnboundedSender<Viewport>,
}

impl LayerHandle {
    pub fn new(kind: LayerKind, tx: mpsc::UnboundedSender<Viewport>) -> Self {
        Self { kind, tx }
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Returns `false` once the task has stopped.
    pub fn notify(&self, viewport: Viewport) -> bool {
        self.tx.send(viewport).is_ok()
    }
}

/// A key whose result reached the surface session `session`.
#[derive(Debug, Clone, PartialEq)]
struct Applied {
    session: Option<u64>,
    key: LayerQueryKey,
}

struct LayerState<T> {
    debounce: Debouncer<Viewport>,
    pending: PendingSlot<LayerQueryKey, Result<T, ApiError>>,
    last_applied: Option<Applied>,
}

pub struct LayerSyncTask<L: Layer> {
    layer: L,
    deps: SyncDeps,
    state: LayerState<L::Output>,
}

impl<L: Layer> LayerSyncTask<L> {
    pub fn new(layer: L, quiet_window: Duration, deps: SyncDeps) -> Self {
        Self {
            layer,
            deps,
            state: LayerState {
                debounce: Debouncer::new(quiet_window),
                pending: PendingSlot::new(),
                last_applied: None,
            },
        }
    }

    /// Spawn the task on the current runtime.
    pub fn spawn(self) -> LayerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = LayerHandle::new(self.layer.kind(), tx);
        tokio::spawn(self.run(rx));
        handle
    }

    /// Runs until every [`LayerHandle`] is dropped. Anything still in flight
    /// is cancelled on the way out.
    pub async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Viewport>) {
        let name = self.layer.kind().name();
        debug!(layer = name, "layer task started");
        loop {
            tokio::select! {
                received = inbox.recv() => match received {
                    Some(viewport) => self.state.debounce.schedule(viewport),
                    None => break,
                },
                viewport = self.state.debounce.settled() => self.on_settled(viewport),
                done = self.state.pending.completion() => self.on_completion(done),
            }
        }
        self.state.pending.cancel();
        debug!(layer = name, "layer task stopped");
    }

    fn name(&self) -> &'static str {
        self.layer.kind().name()
    }

    fn record(&self, event: SyncEvent) {
        self.deps.metrics.record(self.name(), event);
    }

    fn cancel_pending(&mut self) {
        if let Some(key) = self.state.pending.cancel() {
            debug!(layer = self.name(), %key, "cancelled superseded request");
            self.record(SyncEvent::FetchCancelled);
        }
    }

    fn surface_session(&self) -> Option<u64> {
        self.deps.outputs.bridge.session()
    }

    fn is_applied(&self, key: &LayerQueryKey) -> bool {
        self.state
            .last_applied
            .as_ref()
            .is_some_and(|a| &a.key == key && a.session == self.surface_session())
    }

    fn on_settled(&mut self, viewport: Viewport) {
        let ctx = LayerContext::new(viewport, self.deps.controls.snapshot());

        let Some(plan) = self.layer.plan(&ctx) else {
            debug!(layer = self.name(), band = %ctx.band, zoom = viewport.zoom, "view ineligible; clearing");
            self.cancel_pending();
            self.state.last_applied = None;
            self.record(SyncEvent::GatedClear);
            self.layer.clear(&self.deps.outputs);
            return;
        };

        let key = self.layer.query_key(&ctx, &plan);
        if self.state.pending.key() == Some(&key) {
            debug!(layer = self.name(), %key, "same query already in flight");
            self.record(SyncEvent::DedupSkipped);
            return;
        }
        if self.is_applied(&key) {
            // Intentionally supersedes a different in-flight request: the
            // surface already shows this key and that result would replace
            // it with a view the user left.
            self.cancel_pending();
            debug!(layer = self.name(), %key, "unchanged since last apply");
            self.record(SyncEvent::DedupSkipped);
            return;
        }

        let fut = self.layer.fetch(Arc::clone(&self.deps.api), plan);
        let (cancelled, generation) = self.state.pending.start(key.clone(), fut);
        if let Some(stale) = cancelled {
            debug!(layer = self.name(), key = %stale, "cancelled superseded request");
            self.record(SyncEvent::FetchCancelled);
        }
        debug!(layer = self.name(), %key, generation, "fetch started");
        self.record(SyncEvent::FetchStarted);
    }

    fn on_completion(&mut self, done: Completion<LayerQueryKey, Result<L::Output, ApiError>>) {
        let Completion {
            generation,
            key,
            output,
        } = done;
        if !self.state.pending.is_current(generation) {
            debug!(layer = self.name(), %key, "ignoring late completion");
            return;
        }

        match output {
            Ok(Ok(result)) => {
                let session = self.surface_session();
                let delivered = if self.layer.is_empty(&result) {
                    debug!(layer = self.name(), %key, "empty result; clearing");
                    self.record(SyncEvent::EmptyClear);
                    self.layer.clear(&self.deps.outputs)
                } else {
                    self.layer.show(result, &self.deps.outputs)
                };
                self.record(SyncEvent::FetchApplied);
                self.state.last_applied = if delivered {
                    Some(Applied { session, key })
                } else {
                    debug!(layer = self.name(), %key, "result not delivered; key not recorded");
                    None
                };
            }
            Ok(Err(error)) => {
                warn!(layer = self.name(), %key, "fetch failed: {error}");
                self.record(SyncEvent::FetchFailed);
                self.state.last_applied = None;
                self.layer.clear(&self.deps.outputs);
                self.layer.on_failure(&error, &self.deps.outputs);
            }
            Err(join) if join.is_cancelled() => {
                debug!(layer = self.name(), %key, "fetch task aborted");
            }
            Err(join) => {
                warn!(layer = self.name(), %key, "fetch task panicked: {join}");
                self.record(SyncEvent::FetchFailed);
                self.state.last_applied = None;
                self.layer.clear(&self.deps.outputs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiErrorKind, AreaStatRow, BoundaryLevel, BoundaryQuery, MarkerRow};
    use crate::boundaries::BoundariesLayer;
    use crate::controls::ControlState;
    use crate::markers::MarkersLayer;
    use crate::stats::AreaStatsLayer;
    use crate::testing::{ApiCall, FakeApi};
    use crate::ui::UiState;
    use bridge::{Attachment, BridgeChannel, FeatureCollection, OutboundMessage};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::time::sleep;

    struct Harness {
        api: Arc<FakeApi>,
        deps: SyncDeps,
        surface: Attachment,
    }

    fn harness() -> Harness {
        let api = Arc::new(FakeApi::new());
        let bridge = BridgeChannel::new();
        let surface = bridge.attach();
        bridge.mark_ready();
        let deps = SyncDeps {
            api: api.clone(),
            controls: Controls::new(ControlState::default()),
            outputs: LayerOutputs {
                bridge,
                ui: UiState::new(),
            },
            metrics: SharedMetrics::new(),
        };
        Harness { api, deps, surface }
    }

    impl Harness {
        fn sent(&mut self) -> Vec<OutboundMessage> {
            std::iter::from_fn(|| self.surface.outbound.try_recv().ok()).collect()
        }

        fn sent_kinds(&mut self) -> Vec<&'static str> {
            self.sent().iter().map(OutboundMessage::kind).collect()
        }
    }

    fn seoul(zoom: i32) -> Viewport {
        Viewport::new(37.7, 37.4, 127.2, 126.8, zoom).unwrap()
    }

    fn two_features() -> FeatureCollection {
        FeatureCollection(json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature"}, {"type": "Feature"}]
        }))
    }

    fn marker_row(id: &str) -> MarkerRow {
        MarkerRow {
            apt_cd: Some(id.to_string()),
            apt_nm: Some(format!("apt {id}")),
            lat: Some(37.5),
            lng: Some(127.0),
            ..MarkerRow::default()
        }
    }

    const WINDOW: Duration = Duration::from_millis(100);

    async fn quiet() {
        sleep(Duration::from_secs(2)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_updates_coalesce_into_one_fetch() {
        let mut h = harness();
        h.api.set_boundaries(Ok(two_features()));
        let layer = LayerSyncTask::new(BoundariesLayer, WINDOW, h.deps.clone()).spawn();

        for zoom in [12, 13, 14] {
            layer.notify(seoul(zoom));
            sleep(Duration::from_millis(20)).await;
        }
        assert!(h.api.calls().is_empty(), "nothing fires inside the window");
        assert!(h.sent().is_empty());

        quiet().await;
        assert_eq!(
            h.api.calls(),
            vec![ApiCall::Boundaries(BoundaryQuery::new(&seoul(14), BoundaryLevel::Emd))]
        );
        assert_eq!(h.sent(), vec![OutboundMessage::ShowEmd(two_features())]);
    }

    #[tokio::test(start_paused = true)]
    async fn city_zoom_fetches_sido_outline() {
        let mut h = harness();
        h.api.set_boundaries(Ok(two_features()));
        let layer = LayerSyncTask::new(BoundariesLayer, WINDOW, h.deps.clone()).spawn();

        layer.notify(seoul(11));
        quiet().await;

        let calls = h.api.calls();
        assert_eq!(calls.len(), 1);
        let ApiCall::Boundaries(q) = &calls[0] else {
            panic!("expected a boundary call, got {:?}", calls[0]);
        };
        assert_eq!(q.level, BoundaryLevel::Sido);
        assert_eq!(q.zoom, 11);
        assert_eq!(h.sent(), vec![OutboundMessage::ShowSido(two_features())]);
    }

    #[tokio::test(start_paused = true)]
    async fn ineligible_views_clear_without_fetching() {
        let mut h = harness();
        let bounds = LayerSyncTask::new(BoundariesLayer, WINDOW, h.deps.clone()).spawn();
        let markers = LayerSyncTask::new(MarkersLayer::default(), WINDOW, h.deps.clone()).spawn();

        bounds.notify(seoul(10));
        markers.notify(seoul(10));
        quiet().await;

        assert!(h.api.calls().is_empty());
        let mut kinds = h.sent_kinds();
        kinds.sort();
        assert_eq!(kinds, vec!["clearBounds", "clearPlaces"]);
        assert_eq!(h.deps.metrics.count("boundaries", SyncEvent::GatedClear), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn marker_band_fetches_markers_and_drops_boundaries() {
        let mut h = harness();
        h.api.set_markers(Ok(vec![marker_row("A1")]));
        let bounds = LayerSyncTask::new(BoundariesLayer, WINDOW, h.deps.clone()).spawn();
        let markers = LayerSyncTask::new(MarkersLayer::default(), WINDOW, h.deps.clone()).spawn();

        bounds.notify(seoul(17));
        markers.notify(seoul(17));
        quiet().await;

        let calls = h.api.calls();
        assert_eq!(calls.len(), 1);
        let ApiCall::Markers(q) = &calls[0] else {
            panic!("expected a markers call, got {:?}", calls[0]);
        };
        assert_eq!((q.north, q.south, q.east, q.west), (37.7, 37.4, 127.2, 126.8));
        assert_eq!((q.limit, q.offset), (2000, 0));

        let sent = h.sent();
        assert!(sent.contains(&OutboundMessage::ClearBounds));
        assert!(sent.iter().any(|m| matches!(m, OutboundMessage::ShowPlaces(p) if p.len() == 1)));
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_key_is_fetched_once() {
        let mut h = harness();
        h.api.set_geo_summary(Ok(vec![]));
        let stats = LayerSyncTask::new(AreaStatsLayer, WINDOW, h.deps.clone()).spawn();

        stats.notify(seoul(12));
        quiet().await;
        // Sub-rounding jitter produces the same key.
        stats.notify(Viewport::new(37.70001, 37.4, 127.2, 126.80002, 12).unwrap());
        quiet().await;

        assert_eq!(h.api.calls().len(), 1);
        assert_eq!(h.deps.metrics.count("stats", SyncEvent::DedupSkipped), 1);
        assert_eq!(h.sent_kinds(), vec!["clearStats"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stats_only_show_areas_inside_the_view() {
        let mut h = harness();
        let row = |code: &str, lat: f64, lng: f64| AreaStatRow {
            code: Some(code.to_string()),
            name: Some(format!("area {code}")),
            lat: Some(lat),
            lng: Some(lng),
            sale_tx: Some(3.0),
            ..AreaStatRow::default()
        };
        // Gangnam is inside the Seoul view; Busan is not.
        h.api.set_geo_summary(Ok(vec![row("11680", 37.5, 127.05), row("26350", 35.1, 129.0)]));
        let stats = LayerSyncTask::new(AreaStatsLayer, WINDOW, h.deps.clone()).spawn();

        stats.notify(seoul(12));
        quiet().await;

        let sent = h.sent();
        let [OutboundMessage::ShowStats(areas)] = sent.as_slice() else {
            panic!("expected a single showStats, got {sent:?}");
        };
        let codes: Vec<_> = areas.iter().map(|a| a.code.as_deref()).collect();
        assert_eq!(codes, vec![Some("11680")]);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_fetch_never_reaches_the_surface() {
        let mut h = harness();
        h.api.set_markers(Ok(vec![marker_row("A1")]));
        h.api.push_latency(Duration::from_secs(1));
        let markers = LayerSyncTask::new(MarkersLayer::default(), WINDOW, h.deps.clone()).spawn();

        let first = seoul(17);
        let second = Viewport::new(37.6, 37.3, 127.1, 126.7, 17).unwrap();
        markers.notify(first);
        sleep(Duration::from_millis(150)).await; // first fetch now in flight
        markers.notify(second);
        quiet().await;

        assert_eq!(h.api.calls().len(), 2);
        assert_eq!(h.sent_kinds(), vec!["showPlaces"], "only the second result is shown");
        assert_eq!(h.deps.metrics.count("markers", SyncEvent::FetchCancelled), 1);
        assert_eq!(h.deps.metrics.count("markers", SyncEvent::FetchApplied), 1);

        // The applied key is the second view's, not the cancelled one's.
        markers.notify(second);
        quiet().await;
        assert_eq!(h.api.calls().len(), 2);
        markers.notify(first);
        quiet().await;
        assert_eq!(h.api.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_failure_is_ignored() {
        let mut h = harness();
        h.api.set_markers(Err(ApiErrorKind::Timeout));
        h.api.push_latency(Duration::from_secs(1));
        let markers = LayerSyncTask::new(MarkersLayer::default(), WINDOW, h.deps.clone()).spawn();

        markers.notify(seoul(17));
        sleep(Duration::from_millis(150)).await; // failing fetch now in flight
        h.api.set_markers(Ok(vec![marker_row("A1")]));
        markers.notify(Viewport::new(37.6, 37.3, 127.1, 126.7, 17).unwrap());
        quiet().await;

        assert_eq!(h.api.calls().len(), 2);
        assert_eq!(h.sent_kinds(), vec!["showPlaces"]);
        assert!(h.deps.outputs.ui.recent_notices().is_empty());
        assert_eq!(h.deps.metrics.count("markers", SyncEvent::FetchFailed), 0);
        assert_eq!(h.deps.metrics.count("markers", SyncEvent::FetchCancelled), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn undelivered_result_is_fetched_again() {
        let h = harness();
        h.api.set_markers(Ok(vec![marker_row("A1")]));
        h.api.push_latency(Duration::from_secs(1));
        let markers = LayerSyncTask::new(MarkersLayer::default(), WINDOW, h.deps.clone()).spawn();

        markers.notify(seoul(17));
        sleep(Duration::from_millis(150)).await;
        // A reloaded surface attaches while the fetch is in flight and has
        // not reported ready when the result lands.
        let mut reloaded = h.deps.outputs.bridge.attach();
        quiet().await;
        assert!(reloaded.outbound.try_recv().is_err());

        h.deps.outputs.bridge.mark_ready();
        markers.notify(seoul(17));
        quiet().await;

        assert_eq!(h.api.calls().len(), 2);
        assert_eq!(
            reloaded.outbound.try_recv().ok().map(|m| m.kind()),
            Some("showPlaces")
        );
        assert_eq!(h.deps.metrics.count("markers", SyncEvent::DedupSkipped), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn applied_key_does_not_carry_over_to_a_new_session() {
        let h = harness();
        h.api.set_markers(Ok(vec![marker_row("A1")]));
        let markers = LayerSyncTask::new(MarkersLayer::default(), WINDOW, h.deps.clone()).spawn();

        markers.notify(seoul(17));
        quiet().await;
        let mut reloaded = h.deps.outputs.bridge.attach();
        h.deps.outputs.bridge.mark_ready();
        markers.notify(seoul(17));
        quiet().await;

        assert_eq!(h.api.calls().len(), 2);
        assert_eq!(
            reloaded.outbound.try_recv().ok().map(|m| m.kind()),
            Some("showPlaces")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn returning_to_applied_view_cancels_detour() {
        let mut h = harness();
        h.api.set_markers(Ok(vec![marker_row("A1")]));
        let markers = LayerSyncTask::new(MarkersLayer::default(), WINDOW, h.deps.clone()).spawn();

        let home = seoul(17);
        markers.notify(home);
        quiet().await;
        assert_eq!(h.sent_kinds(), vec!["showPlaces"]);

        h.api.push_latency(Duration::from_secs(1));
        markers.notify(Viewport::new(37.6, 37.3, 127.1, 126.7, 17).unwrap());
        sleep(Duration::from_millis(150)).await;
        markers.notify(home);
        quiet().await;

        assert_eq!(h.api.calls().len(), 2);
        assert!(h.sent().is_empty(), "detour result must not overwrite the home view");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_marker_result_clears() {
        let mut h = harness();
        h.api.set_markers(Ok(vec![]));
        let markers = LayerSyncTask::new(MarkersLayer::default(), WINDOW, h.deps.clone()).spawn();

        markers.notify(seoul(18));
        quiet().await;
        assert_eq!(h.sent(), vec![OutboundMessage::ClearPlaces]);
    }

    #[tokio::test(start_paused = true)]
    async fn marker_failure_is_surfaced_to_the_user() {
        let mut h = harness();
        h.api.set_markers(Err(ApiErrorKind::Timeout));
        let markers = LayerSyncTask::new(MarkersLayer::default(), WINDOW, h.deps.clone()).spawn();

        markers.notify(seoul(17));
        quiet().await;

        assert_eq!(h.sent(), vec![OutboundMessage::ClearPlaces]);
        assert_eq!(h.deps.outputs.ui.recent_notices().len(), 1);

        // A failure records no key, so the same view is retried next time.
        h.api.set_markers(Ok(vec![marker_row("A1")]));
        markers.notify(seoul(17));
        quiet().await;
        assert_eq!(h.api.calls().len(), 2);
        assert_eq!(h.sent_kinds(), vec!["showPlaces"]);
    }

    #[tokio::test(start_paused = true)]
    async fn supplementary_failures_are_silent() {
        let mut h = harness();
        h.api.set_boundaries(Err(ApiErrorKind::Status(500)));
        let bounds = LayerSyncTask::new(BoundariesLayer, WINDOW, h.deps.clone()).spawn();

        bounds.notify(seoul(13));
        quiet().await;

        assert_eq!(h.sent(), vec![OutboundMessage::ClearBounds]);
        assert!(h.deps.outputs.ui.recent_notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn gated_clear_cancels_in_flight_request() {
        let mut h = harness();
        h.api.set_markers(Ok(vec![marker_row("A1")]));
        h.api.push_latency(Duration::from_secs(1));
        let markers = LayerSyncTask::new(MarkersLayer::default(), WINDOW, h.deps.clone()).spawn();

        markers.notify(seoul(17));
        sleep(Duration::from_millis(150)).await;
        markers.notify(seoul(15));
        quiet().await;

        assert_eq!(h.sent_kinds(), vec!["clearPlaces"]);
        assert_eq!(h.deps.metrics.count("markers", SyncEvent::FetchCancelled), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn boundary_toggle_gates_the_layer() {
        let mut h = harness();
        h.api.set_boundaries(Ok(two_features()));
        h.deps.controls.set_boundaries_enabled(false);
        let bounds = LayerSyncTask::new(BoundariesLayer, WINDOW, h.deps.clone()).spawn();

        bounds.notify(seoul(12));
        quiet().await;
        assert!(h.api.calls().is_empty());
        assert_eq!(h.sent_kinds(), vec!["clearBounds"]);
    }
}
