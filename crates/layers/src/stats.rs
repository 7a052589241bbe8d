use std::sync::Arc;

use bridge::{AreaStat, OutboundMessage};
use foundation::{Viewport, ZoomBand};

use crate::api::{ApiError, AreaStatRow, BoxFuture, LayerApi, StatsQuery};
use crate::layer::{Layer, LayerContext, LayerKind, LayerOutputs};
use crate::query::LayerQueryKey;

/// District/neighborhood statistic labels.
///
/// The remote endpoint returns every area of a scope; only labels inside the
/// current view are sent to the surface.
#[derive(Debug, Clone, Default)]
pub struct AreaStatsLayer;

#[derive(Debug, Clone)]
pub struct StatsPlan {
    pub query: StatsQuery,
    pub viewport: Viewport,
}

impl Layer for AreaStatsLayer {
    type Plan = StatsPlan;
    type Output = Vec<AreaStat>;

    fn kind(&self) -> LayerKind {
        LayerKind::AreaStats
    }

    fn plan(&self, ctx: &LayerContext) -> Option<StatsPlan> {
        match ctx.band {
            ZoomBand::District | ZoomBand::Neighborhood => Some(StatsPlan {
                query: StatsQuery {
                    scope: ctx.band.as_str(),
                    period: ctx.controls.period.as_str(),
                },
                viewport: ctx.viewport,
            }),
            _ => None,
        }
    }

    fn query_key(&self, ctx: &LayerContext, plan: &StatsPlan) -> LayerQueryKey {
        LayerQueryKey::new(plan.query.scope, Some(ctx.controls.period), &ctx.viewport)
    }

    fn fetch(
        &self,
        api: Arc<dyn LayerApi>,
        plan: StatsPlan,
    ) -> BoxFuture<'static, Result<Vec<AreaStat>, ApiError>> {
        Box::pin(async move {
            let StatsPlan { query, viewport } = plan;
            let rows = api.geo_summary(query).await?;
            Ok(rows
                .into_iter()
                .filter_map(AreaStatRow::into_stat)
                .filter(|s| viewport.contains(s.lat, s.lng))
                .collect())
        })
    }

    fn is_empty(&self, output: &Vec<AreaStat>) -> bool {
        output.is_empty()
    }

    fn show(&self, output: Vec<AreaStat>, out: &LayerOutputs) -> bool {
        out.bridge.send(OutboundMessage::ShowStats(output))
    }

    fn clear(&self, out: &LayerOutputs) -> bool {
        out.bridge.send(OutboundMessage::ClearStats)
    }
}
