use std::sync::Arc;

use crate::api::{ApiError, BoxFuture, LayerApi, Summary, SummaryQuery};
use crate::layer::{Layer, LayerContext, LayerKind, LayerOutputs};
use crate::query::LayerQueryKey;

/// Headline summary bar. Lives in UI state only; it has no render command.
#[derive(Debug, Clone, Default)]
pub struct SummaryLayer {
    /// Off unless the deployment serves `/api/summary`.
    pub enabled: bool,
}

impl Layer for SummaryLayer {
    type Plan = SummaryQuery;
    type Output = Summary;

    fn kind(&self) -> LayerKind {
        LayerKind::Summary
    }

    fn plan(&self, ctx: &LayerContext) -> Option<SummaryQuery> {
        if !self.enabled {
            return None;
        }
        let scope = ctx.band.scope()?;
        let v = &ctx.viewport;
        Some(SummaryQuery {
            scope,
            period: ctx.controls.period.as_str(),
            north: v.north,
            south: v.south,
            east: v.east,
            west: v.west,
        })
    }

    fn query_key(&self, ctx: &LayerContext, plan: &SummaryQuery) -> LayerQueryKey {
        LayerQueryKey::new(plan.scope, Some(ctx.controls.period), &ctx.viewport)
            .with_extent(&ctx.viewport)
    }

    fn fetch(
        &self,
        api: Arc<dyn LayerApi>,
        plan: SummaryQuery,
    ) -> BoxFuture<'static, Result<Summary, ApiError>> {
        Box::pin(async move { api.summary(plan).await })
    }

    fn is_empty(&self, _output: &Summary) -> bool {
        false
    }

    fn show(&self, output: Summary, out: &LayerOutputs) -> bool {
        out.ui.set_summary(Some(output));
        true
    }

    fn clear(&self, out: &LayerOutputs) -> bool {
        out.ui.set_summary(None);
        true
    }
}
