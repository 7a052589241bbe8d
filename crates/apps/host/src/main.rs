use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use bridge::{Attachment, BridgeChannel};
use engine::Engine;
use http::Method;
use parking_lot::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod control;
mod http_api;
mod ws_bridge;

use config::HostConfig;
use http_api::HttpApi;

/// Shared handle to the engine. The lock is never held across an await.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<Mutex<Engine>>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn with_engine<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        f(&mut self.engine.lock())
    }

    pub fn handle_text(&self, text: &str) {
        self.with_engine(|e| e.handle_text(text));
    }

    pub fn attach(&self) -> Attachment {
        self.with_engine(|e| e.bridge().attach())
    }

    pub fn detach(&self, session: u64) -> bool {
        self.with_engine(|e| e.bridge().detach(session))
    }
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    Router::new()
        .route("/healthz", get(control::healthz))
        .route("/bridge", get(ws_bridge::bridge_ws))
        .route("/status", get(control::get_status))
        .route("/selection", get(control::get_selection))
        .route("/summary", get(control::get_summary))
        .route("/control/period", post(control::set_period))
        .route("/control/boundaries", post(control::set_boundaries))
        .route("/control/base", post(control::switch_base))
        .route("/control/cards", post(control::set_cards))
        .route("/control/move", post(control::move_to))
        .route("/control/reset", post(control::reset_view))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// One event loop for every layer task, selection fetch and handler.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match HostConfig::from_env() {
        Ok(c) => c,
        Err(err) => {
            error!("{err}");
            std::process::exit(2);
        }
    };
    let api = match HttpApi::new(&config.api) {
        Ok(api) => api,
        Err(err) => {
            error!("{err}");
            std::process::exit(2);
        }
    };
    info!(
        api = %config.api.base_url,
        stats = config.sync.stats_enabled,
        period = %config.sync.period,
        "starting map sync host"
    );

    let engine = Engine::new(Arc::new(api), BridgeChannel::new(), &config.sync);
    let app = router(AppState::new(engine));

    let listener = match tokio::net::TcpListener::bind(config.addr).await {
        Ok(l) => l,
        Err(err) => {
            error!("failed to bind {}: {err}", config.addr);
            std::process::exit(1);
        }
    };
    info!("map sync host listening on http://{}", config.addr);
    if let Err(err) = axum::serve(listener, app).await {
        error!("server error: {err}");
    }
}
