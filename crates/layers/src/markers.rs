use std::sync::Arc;

use bridge::{MarkerRecord, OutboundMessage};
use foundation::ZoomBand;

use crate::api::{ApiError, BoxFuture, LayerApi, MarkerQuery, MarkerRow};
use crate::layer::{Layer, LayerContext, LayerKind, LayerOutputs};
use crate::query::LayerQueryKey;
use crate::ui::Notice;

pub const DEFAULT_MARKER_LIMIT: u32 = 2000;

/// Point markers, the primary layer. Only shown in the marker band; failures
/// are reported to the user.
#[derive(Debug, Clone)]
pub struct MarkersLayer {
    pub limit: u32,
}

impl Default for MarkersLayer {
    fn default() -> Self {
        Self {
            limit: DEFAULT_MARKER_LIMIT,
        }
    }
}

impl Layer for MarkersLayer {
    type Plan = MarkerQuery;
    type Output = Vec<MarkerRecord>;

    fn kind(&self) -> LayerKind {
        LayerKind::Markers
    }

    fn plan(&self, ctx: &LayerContext) -> Option<MarkerQuery> {
        (ctx.band == ZoomBand::Marker)
            .then(|| MarkerQuery::new(&ctx.viewport, self.limit, ctx.controls.period))
    }

    fn query_key(&self, ctx: &LayerContext, _plan: &MarkerQuery) -> LayerQueryKey {
        LayerQueryKey::new(ctx.band.as_str(), Some(ctx.controls.period), &ctx.viewport)
            .with_extent(&ctx.viewport)
    }

    fn fetch(
        &self,
        api: Arc<dyn LayerApi>,
        plan: MarkerQuery,
    ) -> BoxFuture<'static, Result<Vec<MarkerRecord>, ApiError>> {
        Box::pin(async move {
            let rows = api.markers(plan).await?;
            Ok(rows.into_iter().filter_map(MarkerRow::into_record).collect())
        })
    }

    fn is_empty(&self, output: &Vec<MarkerRecord>) -> bool {
        output.is_empty()
    }

    fn show(&self, output: Vec<MarkerRecord>, out: &LayerOutputs) -> bool {
        out.bridge.send(OutboundMessage::ShowPlaces(output))
    }

    fn clear(&self, out: &LayerOutputs) -> bool {
        out.bridge.send(OutboundMessage::ClearPlaces)
    }

    fn on_failure(&self, _error: &ApiError, out: &LayerOutputs) {
        out.ui.notify(Notice::new(
            "Server connection failed",
            "Could not load markers for this area.",
        ));
    }
}
