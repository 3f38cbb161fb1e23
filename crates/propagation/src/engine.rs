//! The propagation engine

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, warn};
use veilnet_core::{
    Packet, PropagationEnvelope, PropagationPacket, Result, TargetRi, TypedPacket, VeilNetError,
};
use veilnet_crypto::sha256_hex;
use veilnet_ssu::{HandlerContext, PacketHandler, SsuNode};

use crate::peers::PeerDirectory;

/// Loop-suppression cache bound.
pub const SEEN_CACHE_SIZE: usize = 1024;

/// Age after which a seen entry no longer suppresses re-delivery.
pub const SEEN_CACHE_TTL: Duration = Duration::from_secs(60);

/// Originates and re-broadcasts propagation floods. Holds only a weak
/// reference back to the node that owns it.
pub struct Propagator {
    node: Weak<SsuNode>,
    peers: Arc<PeerDirectory>,
    seen: Mutex<LruCache<String, Instant>>,
}

impl Propagator {
    pub fn new(node: Weak<SsuNode>, peers: Arc<PeerDirectory>) -> Self {
        let capacity = NonZeroUsize::new(SEEN_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            node,
            peers,
            seen: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn peers(&self) -> &Arc<PeerDirectory> {
        &self.peers
    }

    fn node(&self) -> Result<Arc<SsuNode>> {
        self.node.upgrade().ok_or(VeilNetError::Shutdown)
    }

    /// Record an inner-packet hash. Returns false when it was already
    /// seen inside the TTL window.
    fn mark_seen(&self, hash: &str) -> bool {
        let mut seen = self.seen.lock();
        if let Some(at) = seen.get(hash) {
            if at.elapsed() < SEEN_CACHE_TTL {
                return false;
            }
        }
        seen.put(hash.to_string(), Instant::now());
        true
    }

    /// Originate a flood of `inner` at the given depth.
    ///
    /// The local cache is seeded first so this node never re-delivers its
    /// own origination when the flood comes back around.
    pub async fn propagate(&self, inner: &Packet, depth: u32, target: TargetRi) -> Result<()> {
        self.mark_seen(&sha256_hex(inner.raw()));
        let envelope = PropagationEnvelope::wrap(inner, depth, target);
        self.broadcast(&envelope, None).await
    }

    /// Send an envelope to every selected peer, skipping `exclude`.
    /// Per-peer failures are logged; the rest are still attempted.
    async fn broadcast(
        &self,
        envelope: &PropagationEnvelope,
        exclude: Option<SocketAddr>,
    ) -> Result<()> {
        let node = self.node()?;
        let template = PropagationPacket::build(envelope)?;

        let mut sent = 0usize;
        for peer in self.peers.select(envelope.target_ri) {
            if Some(peer) == exclude {
                continue;
            }
            let packet = template.clone().with_addr(peer);
            match node.send_packet(&packet).await {
                Ok(()) => sent += 1,
                Err(e) => warn!(%peer, "propagation send failed: {e}"),
            }
        }
        debug!(
            sent,
            depth = envelope.current_depth,
            "propagation broadcast complete"
        );
        Ok(())
    }
}

#[async_trait]
impl PacketHandler for Propagator {
    async fn handle(&self, packet: TypedPacket, ctx: HandlerContext) -> Result<()> {
        let TypedPacket::Propagation(propagation) = packet else {
            debug!("propagation hook ignoring non-propagation packet");
            return Ok(());
        };
        let envelope = propagation.envelope;
        let inner = envelope.inner_packet();

        let hash = sha256_hex(inner.raw());
        if !self.mark_seen(&hash) {
            debug!(peer = %ctx.peer, "propagation already seen, dropped");
            return Ok(());
        }

        // Deliver locally as if the inner packet had arrived natively
        let node = self.node()?;
        node.dispatch_local(inner, ctx.peer).await;

        // Fan back out while depth remains
        if envelope.current_depth > 0 {
            self.broadcast(&envelope.decremented(), Some(ctx.peer))
                .await?;
        }
        Ok(())
    }
}
