use bridge::BridgeChannel;
use foundation::Viewport;
use layers::LayerHandle;
use tracing::{debug, info};

/// Latest viewport plus the layers that follow it.
///
/// Readiness lives on the [`BridgeChannel`], so a reconnecting surface resets
/// it here too. Viewports applied before readiness are kept but not
/// forwarded; [`ViewportStore::mark_ready`] forwards the latest one.
pub struct ViewportStore {
    channel: BridgeChannel,
    current: Option<Viewport>,
    subscribers: Vec<LayerHandle>,
}

impl ViewportStore {
    pub fn new(channel: BridgeChannel) -> Self {
        Self {
            channel,
            current: None,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, layer: LayerHandle) {
        self.subscribers.push(layer);
    }

    pub fn is_ready(&self) -> bool {
        self.channel.is_ready()
    }

    pub fn current(&self) -> Option<Viewport> {
        self.current
    }

    /// Idempotent. Returns `true` only for the call that flipped readiness.
    pub fn mark_ready(&mut self) -> bool {
        let flipped = self.channel.mark_ready();
        if flipped {
            info!("surface ready");
            self.refresh();
        }
        flipped
    }

    /// Last write wins.
    pub fn apply_viewport(&mut self, viewport: Viewport) {
        self.current = Some(viewport);
        if !self.refresh() {
            debug!(zoom = viewport.zoom, "viewport held until the surface is ready");
        }
    }

    /// Re-sends the current viewport to every layer. Returns whether anything
    /// was sent.
    pub fn refresh(&mut self) -> bool {
        let Some(viewport) = self.current else {
            return false;
        };
        if !self.is_ready() {
            return false;
        }
        self.subscribers.retain(|layer| {
            let alive = layer.notify(viewport);
            if !alive {
                debug!(layer = layer.kind().name(), "dropping stopped layer");
            }
            alive
        });
        true
    }
}
