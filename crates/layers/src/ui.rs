//! State exposed to UI chrome: the summary bar and user-visible notices.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, watch};

use crate::api::Summary;

const RECENT_NOTICES: usize = 16;

/// A user-facing error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiState {
    inner: Arc<UiInner>,
}

#[derive(Debug)]
struct UiInner {
    summary: watch::Sender<Option<Summary>>,
    notices: broadcast::Sender<Notice>,
    recent: Mutex<VecDeque<Notice>>,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        let (summary, _) = watch::channel(None);
        let (notices, _) = broadcast::channel(RECENT_NOTICES);
        Self {
            inner: Arc::new(UiInner {
                summary,
                notices,
                recent: Mutex::new(VecDeque::with_capacity(RECENT_NOTICES)),
            }),
        }
    }

    pub fn set_summary(&self, summary: Option<Summary>) {
        self.inner.summary.send_replace(summary);
    }

    pub fn summary(&self) -> Option<Summary> {
        *self.inner.summary.borrow()
    }

    pub fn watch_summary(&self) -> watch::Receiver<Option<Summary>> {
        self.inner.summary.subscribe()
    }

    pub fn notify(&self, notice: Notice) {
        {
            let mut recent = self.inner.recent.lock();
            if recent.len() == RECENT_NOTICES {
                recent.pop_front();
            }
            recent.push_back(notice.clone());
        }
        // No subscribers is fine; `recent` still has it.
        let _ = self.inner.notices.send(notice);
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notices.subscribe()
    }

    pub fn recent_notices(&self) -> Vec<Notice> {
        self.inner.recent.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Notice, UiState};
    use crate::api::Summary;

    #[test]
    fn recent_notices_are_bounded() {
        let ui = UiState::new();
        for i in 0..20 {
            ui.notify(Notice::new("t", format!("n{i}")));
        }
        let recent = ui.recent_notices();
        assert_eq!(recent.len(), 16);
        assert_eq!(recent[0].body, "n4");
    }

    #[test]
    fn summary_replaces() {
        let ui = UiState::new();
        let rx = ui.watch_summary();
        ui.set_summary(Some(Summary {
            sale: 9.5,
            rent: 5.0,
            trades: 12.0,
        }));
        assert_eq!(rx.borrow().map(|s| s.trades), Some(12.0));
        ui.set_summary(None);
        assert_eq!(ui.summary(), None);
    }
}
