use std::sync::Arc;

use bridge::BridgeChannel;
use foundation::{Viewport, ZoomBand};

use crate::api::{ApiError, BoxFuture, LayerApi};
use crate::controls::ControlState;
use crate::query::LayerQueryKey;
use crate::ui::UiState;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Markers,
    Boundaries,
    AreaStats,
    Summary,
}

impl LayerKind {
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Markers => "markers",
            LayerKind::Boundaries => "boundaries",
            LayerKind::AreaStats => "stats",
            LayerKind::Summary => "summary",
        }
    }
}

/// Everything a layer may look at when a viewport settles.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayerContext {
    pub viewport: Viewport,
    pub band: ZoomBand,
    pub controls: ControlState,
}

impl LayerContext {
    pub fn new(viewport: Viewport, controls: ControlState) -> Self {
        Self {
            viewport,
            band: viewport.band(),
            controls,
        }
    }
}

/// Where layer results go: render commands to the surface, or UI state.
#[derive(Debug, Clone)]
pub struct LayerOutputs {
    pub bridge: BridgeChannel,
    pub ui: UiState,
}

/// One independently synchronized overlay.
///
/// The generic [`crate::sync::LayerSyncTask`] owns timing and
/// cancellation; a `Layer` only says what to fetch and how to show it.
pub trait Layer: Send + Sync + 'static {
    /// The request this layer would make for an eligible view.
    type Plan: Send + 'static;
    type Output: Send + 'static;

    fn kind(&self) -> LayerKind;

    /// `None` means the view is ineligible and the layer must be cleared.
    fn plan(&self, ctx: &LayerContext) -> Option<Self::Plan>;

    fn query_key(&self, ctx: &LayerContext, plan: &Self::Plan) -> LayerQueryKey;

    /// Exactly one remote call per invocation.
    fn fetch(
        &self,
        api: Arc<dyn LayerApi>,
        plan: Self::Plan,
    ) -> BoxFuture<'static, Result<Self::Output, ApiError>>;

    fn is_empty(&self, output: &Self::Output) -> bool;

    /// Returns whether the result reached its destination.
    fn show(&self, output: Self::Output, out: &LayerOutputs) -> bool;

    fn clear(&self, out: &LayerOutputs) -> bool;

    /// Hook for surfacing a failure to the user. Silent by default.
    fn on_failure(&self, _error: &ApiError, _out: &LayerOutputs) {}
}
