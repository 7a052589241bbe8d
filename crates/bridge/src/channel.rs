use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::protocol::OutboundMessage;

/// Host side of the bridge to the rendering surface.
///
/// Sends are fire-and-forget and FIFO. Nothing leaves the host until the
/// current surface has reported `ready`; earlier sends are dropped. One
/// surface session is attached at a time and attaching a new one resets
/// readiness.
#[derive(Debug, Clone, Default)]
pub struct BridgeChannel {
    shared: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    ready: AtomicBool,
    next_session: AtomicU64,
    outlet: Mutex<Option<Outlet>>,
}

#[derive(Debug)]
struct Outlet {
    session: u64,
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

/// Receiving end handed to the transport for one surface session.
#[derive(Debug)]
pub struct Attachment {
    pub session: u64,
    pub outbound: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl BridgeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route outbound traffic to a new surface session, replacing any other.
    pub fn attach(&self) -> Attachment {
        let session = self.shared.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, outbound) = mpsc::unbounded_channel();
        let previous = self.shared.outlet.lock().replace(Outlet { session, tx });
        self.shared.ready.store(false, Ordering::SeqCst);
        if let Some(prev) = previous {
            info!("surface session {} replaced by {session}", prev.session);
        }
        Attachment { session, outbound }
    }

    /// Drop the outlet if `session` still owns it. Returns whether it did.
    pub fn detach(&self, session: u64) -> bool {
        let mut outlet = self.shared.outlet.lock();
        if outlet.as_ref().is_some_and(|o| o.session == session) {
            *outlet = None;
            self.shared.ready.store(false, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    /// Returns `true` only on the not-ready → ready transition.
    pub fn mark_ready(&self) -> bool {
        !self.shared.ready.swap(true, Ordering::SeqCst)
    }

    /// The attached surface session, if any.
    pub fn session(&self) -> Option<u64> {
        self.shared.outlet.lock().as_ref().map(|o| o.session)
    }

    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::SeqCst)
    }

    /// Queue `msg` for the surface. Returns whether it was queued.
    pub fn send(&self, msg: OutboundMessage) -> bool {
        if !self.is_ready() {
            debug!(kind = msg.kind(), "surface not ready; dropping outbound message");
            return false;
        }
        let outlet = self.shared.outlet.lock();
        let Some(outlet) = outlet.as_ref() else {
            debug!(kind = msg.kind(), "no surface attached; dropping outbound message");
            return false;
        };
        outlet.tx.send(msg).is_ok()
    }
}
