use std::sync::Arc;

use bridge::{FeatureCollection, OutboundMessage};

use crate::api::{ApiError, BoundaryLevel, BoundaryQuery, BoxFuture, LayerApi};
use crate::layer::{Layer, LayerContext, LayerKind, LayerOutputs};
use crate::query::LayerQueryKey;

/// Administrative boundary polygons: city, district or neighborhood outlines
/// depending on the band. Disabled by the boundary toggle.
#[derive(Debug, Clone, Default)]
pub struct BoundariesLayer;

impl Layer for BoundariesLayer {
    type Plan = BoundaryQuery;
    type Output = (BoundaryLevel, FeatureCollection);

    fn kind(&self) -> LayerKind {
        LayerKind::Boundaries
    }

    fn plan(&self, ctx: &LayerContext) -> Option<BoundaryQuery> {
        if !ctx.controls.boundaries_enabled {
            return None;
        }
        let level = BoundaryLevel::for_band(ctx.band)?;
        Some(BoundaryQuery::new(&ctx.viewport, level))
    }

    fn query_key(&self, ctx: &LayerContext, plan: &BoundaryQuery) -> LayerQueryKey {
        LayerQueryKey::new(plan.level.as_str(), None, &ctx.viewport).with_extent(&ctx.viewport)
    }

    fn fetch(
        &self,
        api: Arc<dyn LayerApi>,
        plan: BoundaryQuery,
    ) -> BoxFuture<'static, Result<(BoundaryLevel, FeatureCollection), ApiError>> {
        Box::pin(async move {
            let level = plan.level;
            let fc = api.boundaries(plan).await?;
            Ok((level, fc))
        })
    }

    fn is_empty(&self, output: &(BoundaryLevel, FeatureCollection)) -> bool {
        output.1.is_empty()
    }

    fn show(
        &self,
        (level, fc): (BoundaryLevel, FeatureCollection),
        out: &LayerOutputs,
    ) -> bool {
        let msg = match level {
            BoundaryLevel::Sido => OutboundMessage::ShowSido(fc),
            BoundaryLevel::Sgg => OutboundMessage::ShowSgg(fc),
            BoundaryLevel::Emd => OutboundMessage::ShowEmd(fc),
        };
        out.bridge.send(msg)
    }

    fn clear(&self, out: &LayerOutputs) -> bool {
        out.bridge.send(OutboundMessage::ClearBounds)
    }
}
