//! JSON endpoints for UI chrome: status, selection, summary and map controls.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bridge::BaseMode;
use foundation::Period;
use http::StatusCode;
use layers::{Notice, Summary};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::AppState;

pub async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

pub async fn get_status(State(state): State<AppState>) -> Response {
    Json(state.with_engine(|e| e.status())).into_response()
}

pub async fn get_selection(State(state): State<AppState>) -> Response {
    Json(state.with_engine(|e| e.selection_state())).into_response()
}

#[derive(Debug, Serialize)]
pub struct SummaryView {
    pub summary: Option<Summary>,
    pub notices: Vec<Notice>,
}

pub async fn get_summary(State(state): State<AppState>) -> Response {
    let view = state.with_engine(|e| SummaryView {
        summary: e.ui().summary(),
        notices: e.ui().recent_notices(),
    });
    Json(view).into_response()
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

/// `changed` for toggles, `sent` for one-shot map commands.
fn outcome(field: &'static str, value: bool) -> Response {
    Json(json!({ field: value })).into_response()
}

#[derive(Debug, Deserialize)]
pub struct PeriodBody {
    pub period: String,
}

pub async fn set_period(State(state): State<AppState>, Json(body): Json<PeriodBody>) -> Response {
    match body.period.parse::<Period>() {
        Ok(period) => outcome("changed", state.with_engine(|e| e.set_period(period))),
        Err(err) => bad_request(err.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct BoundariesBody {
    pub enabled: bool,
}

pub async fn set_boundaries(
    State(state): State<AppState>,
    Json(body): Json<BoundariesBody>,
) -> Response {
    outcome(
        "changed",
        state.with_engine(|e| e.set_boundaries_enabled(body.enabled)),
    )
}

#[derive(Debug, Deserialize)]
pub struct BaseBody {
    pub mode: String,
}

pub async fn switch_base(State(state): State<AppState>, Json(body): Json<BaseBody>) -> Response {
    match body.mode.parse::<BaseMode>() {
        Ok(mode) => outcome("sent", state.with_engine(|e| e.switch_base(mode))),
        Err(err) => bad_request(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct CardsBody {
    pub visible: bool,
}

pub async fn set_cards(State(state): State<AppState>, Json(body): Json<CardsBody>) -> Response {
    outcome("sent", state.with_engine(|e| e.set_cards(body.visible)))
}

#[derive(Debug, Deserialize)]
pub struct MoveBody {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub zoom: Option<i32>,
}

pub async fn move_to(State(state): State<AppState>, Json(body): Json<MoveBody>) -> Response {
    match state.with_engine(|e| e.move_to(body.lat, body.lng, body.zoom)) {
        Ok(sent) => outcome("sent", sent),
        Err(err) => bad_request(err.to_string()),
    }
}

pub async fn reset_view(State(state): State<AppState>) -> Response {
    outcome("sent", state.with_engine(|e| e.reset_view()))
}
