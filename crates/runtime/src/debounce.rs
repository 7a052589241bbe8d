use std::time::Duration;

use tokio::time::{Instant, sleep_until};

/// Trailing-edge debouncer: only the last value scheduled within a quiet
/// window comes out of [`Debouncer::settled`].
///
/// Superseded values are dropped without any side effect. The type holds no
/// timer of its own; the owning task polls `settled()` from its select loop,
/// which keeps all state mutation on that one task.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    armed: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace any waiting value and restart the quiet window.
    pub fn schedule(&mut self, value: T) {
        self.armed = Some((Instant::now() + self.window, value));
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.as_ref().map(|(at, _)| *at)
    }

    /// Drop the waiting value, if any.
    pub fn disarm(&mut self) -> Option<T> {
        self.armed.take().map(|(_, v)| v)
    }

    /// Resolves with the waiting value once its window elapses.
    ///
    /// Never resolves while disarmed. Cancel-safe: dropping the future before
    /// it completes leaves the waiting value in place.
    pub async fn settled(&mut self) -> T {
        let Some(deadline) = self.deadline() else {
            return std::future::pending().await;
        };
        sleep_until(deadline).await;
        match self.armed.take() {
            Some((_, value)) => value,
            None => std::future::pending().await,
        }
    }
}
