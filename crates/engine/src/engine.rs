//! Wires the bridge, the viewport store, the layer tasks and UI chrome
//! together.

use std::collections::BTreeMap;
use std::sync::Arc;

use bridge::{BaseMode, BridgeChannel, InboundMessage, OutboundMessage, MOVE_TO_DEFAULT_ZOOM};
use foundation::{Period, Viewport, ViewportError, MAX_ZOOM, MIN_ZOOM};
use layers::{
    AreaStatsLayer, BoundariesLayer, ControlState, Controls, LayerApi, LayerOutputs,
    LayerSyncTask, MarkersLayer, SummaryLayer, SyncDeps, UiState,
};
use runtime::SharedMetrics;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::selection::{SelectionFlow, SelectionState};
use crate::store::ViewportStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewportSnapshot {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub zoom: i32,
    pub band: &'static str,
}

impl From<Viewport> for ViewportSnapshot {
    fn from(v: Viewport) -> Self {
        Self {
            north: v.north,
            south: v.south,
            east: v.east,
            west: v.west,
            zoom: v.zoom,
            band: v.band().as_str(),
        }
    }
}

/// Read-only view served on `/status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub ready: bool,
    pub viewport: Option<ViewportSnapshot>,
    pub period: &'static str,
    pub boundaries_enabled: bool,
    pub metrics: BTreeMap<String, u64>,
}

pub struct Engine {
    bridge: BridgeChannel,
    store: ViewportStore,
    controls: Controls,
    selection: SelectionFlow,
    ui: UiState,
    metrics: SharedMetrics,
}

impl Engine {
    /// Spawns one task per layer on the current tokio runtime. The tasks stop
    /// when the engine is dropped.
    pub fn new(api: Arc<dyn LayerApi>, bridge: BridgeChannel, config: &SyncConfig) -> Self {
        let ui = UiState::new();
        let controls = Controls::new(ControlState {
            period: config.period,
            ..ControlState::default()
        });
        let metrics = SharedMetrics::new();
        let deps = SyncDeps {
            api: Arc::clone(&api),
            controls: controls.clone(),
            outputs: LayerOutputs {
                bridge: bridge.clone(),
                ui: ui.clone(),
            },
            metrics: metrics.clone(),
        };

        let mut store = ViewportStore::new(bridge.clone());
        let markers = MarkersLayer {
            limit: config.marker_limit,
        };
        store.subscribe(LayerSyncTask::new(markers, config.markers_debounce, deps.clone()).spawn());
        store.subscribe(
            LayerSyncTask::new(BoundariesLayer, config.boundaries_debounce, deps.clone()).spawn(),
        );
        store.subscribe(
            LayerSyncTask::new(AreaStatsLayer, config.stats_debounce, deps.clone()).spawn(),
        );
        let summary = SummaryLayer {
            enabled: config.stats_enabled,
        };
        store.subscribe(LayerSyncTask::new(summary, config.summary_debounce, deps).spawn());

        Self {
            selection: SelectionFlow::new(api, ui.clone()),
            bridge,
            store,
            controls,
            ui,
            metrics,
        }
    }

    pub fn bridge(&self) -> &BridgeChannel {
        &self.bridge
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn selection(&self) -> &SelectionFlow {
        &self.selection
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Entry point for one text frame from the surface. Malformed frames are
    /// logged and dropped.
    pub fn handle_text(&mut self, text: &str) {
        if let Some(msg) = InboundMessage::decode(text) {
            self.handle_inbound(msg);
        }
    }

    pub fn handle_inbound(&mut self, msg: InboundMessage) {
        match msg {
            InboundMessage::Ready => {
                if !self.store.mark_ready() {
                    debug!("duplicate ready");
                }
            }
            InboundMessage::Bounds(viewport) => self.store.apply_viewport(viewport),
            InboundMessage::MarkerClick(click) => {
                self.selection.select(click);
            }
            InboundMessage::WvError(fault) => {
                warn!("surface fault: {}", fault.summary());
            }
        }
    }

    /// Returns whether the period changed. A change refetches every layer
    /// keyed on it.
    pub fn set_period(&mut self, period: Period) -> bool {
        if !self.controls.set_period(period) {
            return false;
        }
        info!(%period, "period changed");
        self.store.refresh();
        true
    }

    pub fn set_boundaries_enabled(&mut self, enabled: bool) -> bool {
        if !self.controls.set_boundaries_enabled(enabled) {
            return false;
        }
        info!(enabled, "boundary overlay toggled");
        if !enabled {
            self.bridge.send(OutboundMessage::ClearBounds);
        }
        // Also lets the boundary task drop its applied key while disabled.
        self.store.refresh();
        true
    }

    /// Centers the map. `zoom` defaults to the complex-level view.
    pub fn move_to(&self, lat: f64, lng: f64, zoom: Option<i32>) -> Result<bool, ViewportError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(ViewportError::NonFinite);
        }
        let zoom = zoom.unwrap_or(MOVE_TO_DEFAULT_ZOOM);
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
            return Err(ViewportError::ZoomOutOfRange(zoom));
        }
        Ok(self.bridge.send(OutboundMessage::MoveTo { lat, lng, zoom }))
    }

    pub fn switch_base(&self, mode: BaseMode) -> bool {
        self.bridge.send(OutboundMessage::SwitchBase(mode))
    }

    pub fn reset_view(&self) -> bool {
        self.bridge.send(OutboundMessage::ResetSeoul)
    }

    pub fn set_cards(&self, visible: bool) -> bool {
        self.bridge.send(OutboundMessage::CardsToggle(visible))
    }

    pub fn selection_state(&self) -> SelectionState {
        self.selection.state()
    }

    pub fn status(&self) -> EngineStatus {
        let controls = self.controls.snapshot();
        EngineStatus {
            ready: self.store.is_ready(),
            viewport: self.store.current().map(ViewportSnapshot::from),
            period: controls.period.as_str(),
            boundaries_enabled: controls.boundaries_enabled,
            metrics: self.metrics.snapshot().into_iter().collect(),
        }
    }
}
