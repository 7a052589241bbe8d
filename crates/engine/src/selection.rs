use std::sync::Arc;

use bridge::MarkerClick;
use layers::{ApiError, AptBasic, LayerApi, Notice, UiState};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

/// What the detail panel shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionState {
    /// Bumped on every accepted click; completions carrying an older token
    /// are discarded.
    pub token: u64,
    pub loading: bool,
    pub selected_id: Option<String>,
    pub name: Option<String>,
    pub detail: Option<AptBasic>,
}

/// Marker click → one detail fetch → detail panel state.
#[derive(Clone)]
pub struct SelectionFlow {
    api: Arc<dyn LayerApi>,
    ui: UiState,
    state: Arc<watch::Sender<SelectionState>>,
}

impl SelectionFlow {
    pub fn new(api: Arc<dyn LayerApi>, ui: UiState) -> Self {
        let (state, _) = watch::channel(SelectionState::default());
        Self {
            api,
            ui,
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SelectionState> {
        self.state.subscribe()
    }

    /// Starts the detail fetch for `click`. Returns the selection token, or
    /// `None` when the click carries no usable identifier.
    pub fn select(&self, click: MarkerClick) -> Option<u64> {
        let Some(id) = click.entity_id() else {
            debug!("marker click without an identifier; ignored");
            return None;
        };
        let name = click.display_name().map(str::to_string);

        let mut token = 0;
        self.state.send_modify(|s| {
            s.token += 1;
            token = s.token;
            s.loading = true;
            s.selected_id = Some(id.clone());
            s.name = name;
        });
        debug!(apt_cd = %id, token, "selection started");

        let flow = self.clone();
        tokio::spawn(async move {
            let result = flow.api.apartment_basic(id.clone()).await;
            flow.finish(token, &id, result);
        });
        Some(token)
    }

    fn finish(&self, token: u64, id: &str, result: Result<AptBasic, ApiError>) {
        let mut failed = None;
        let applied = self.state.send_if_modified(|s| {
            if s.token != token {
                return false;
            }
            s.loading = false;
            match result {
                Ok(detail) => {
                    if s.name.is_none() {
                        s.name = detail.apt_nm.clone();
                    }
                    s.detail = Some(detail);
                }
                Err(err) => {
                    s.detail = None;
                    failed = Some(err);
                }
            }
            true
        });

        if !applied {
            debug!(apt_cd = id, token, "stale selection completion ignored");
            return;
        }
        if let Some(err) = failed {
            warn!(apt_cd = id, "detail fetch failed: {err}");
            self.ui.notify(Notice::new(
                "Could not load details",
                "The selected complex's information is unavailable right now.",
            ));
        }
    }
}
