pub mod api;
pub mod boundaries;
pub mod controls;
pub mod layer;
pub mod markers;
pub mod query;
pub mod stats;
pub mod summary;
pub mod sync;
pub mod ui;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api::{ApiError, ApiErrorKind, AptBasic, BoundaryLevel, LayerApi, Summary};
pub use boundaries::BoundariesLayer;
pub use controls::{ControlState, Controls};
pub use layer::*;
pub use markers::{DEFAULT_MARKER_LIMIT, MarkersLayer};
pub use query::LayerQueryKey;
pub use stats::AreaStatsLayer;
pub use summary::SummaryLayer;
pub use sync::{LayerHandle, LayerSyncTask, SyncDeps};
pub use ui::{Notice, UiState};
