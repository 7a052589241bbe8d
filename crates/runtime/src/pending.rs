use std::future::Future;

use tokio::task::{JoinError, JoinHandle};

/// Outcome of the in-flight request held by a [`PendingSlot`].
#[derive(Debug)]
pub struct Completion<K, T> {
    pub generation: u64,
    pub key: K,
    /// `Err` when the task panicked or was aborted underneath us.
    pub output: Result<T, JoinError>,
}

#[derive(Debug)]
struct InFlight<K, T> {
    generation: u64,
    key: K,
    handle: JoinHandle<T>,
}

/// At most one cancellable in-flight request, tagged with a generation.
///
/// Every `start` and every `cancel` bumps the generation. A completion is only
/// applied if [`PendingSlot::is_current`] still holds for its generation, so a
/// late result from a superseded request is a no-op rather than an error.
#[derive(Debug)]
pub struct PendingSlot<K, T> {
    generation: u64,
    in_flight: Option<InFlight<K, T>>,
}

impl<K, T> Default for PendingSlot<K, T> {
    fn default() -> Self {
        Self {
            generation: 0,
            in_flight: None,
        }
    }
}

impl<K, T: Send + 'static> PendingSlot<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_active(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Key of the request currently in flight.
    pub fn key(&self) -> Option<&K> {
        self.in_flight.as_ref().map(|f| &f.key)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Cancel whatever is in flight, then spawn `fut` as the new request.
    ///
    /// Returns the cancelled request's key (if any) and the new generation.
    pub fn start<F>(&mut self, key: K, fut: F) -> (Option<K>, u64)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let cancelled = self.cancel();
        self.generation += 1;
        let handle = tokio::spawn(fut);
        self.in_flight = Some(InFlight {
            generation: self.generation,
            key,
            handle,
        });
        (cancelled, self.generation)
    }

    /// Abort the in-flight request. Its result will never be observed.
    pub fn cancel(&mut self) -> Option<K> {
        let in_flight = self.in_flight.take()?;
        in_flight.handle.abort();
        self.generation += 1;
        Some(in_flight.key)
    }

    /// Resolves when the in-flight request finishes. Pending forever when idle.
    ///
    /// Cancel-safe: the request stays in the slot if this future is dropped.
    pub async fn completion(&mut self) -> Completion<K, T> {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return std::future::pending().await;
        };
        let output = (&mut in_flight.handle).await;
        let Some(done) = self.in_flight.take() else {
            return std::future::pending().await;
        };
        Completion {
            generation: done.generation,
            key: done.key,
            output,
        }
    }
}

impl<K, T> Drop for PendingSlot<K, T> {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
        }
    }
}
