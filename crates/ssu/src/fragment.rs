//! Fragmentation and reassembly
//!
//! A serialized packet over [`MAX_UDP_PACKET_SIZE`] is chunked and each
//! chunk shipped as its own `SSU_FRAGMENT` datagram. The reassembly table
//! is keyed by `(sender, fragment_id)`, tolerates duplicates and
//! out-of-order arrival, and evicts partial sets after
//! [`FRAGMENT_TIMEOUT`].

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;
use veilnet_core::{FragmentPacket, Packet};

/// Maximum UDP datagram this node emits without fragmenting (conservative).
pub const MAX_UDP_PACKET_SIZE: usize = 1400;

/// Age at which an incomplete fragment set is dropped.
pub const FRAGMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Split a serialized packet into fragment datagrams.
///
/// Returns `None` when the packet fits in a single datagram.
pub fn fragment_raw(raw: &[u8]) -> Option<Vec<Packet>> {
    if raw.len() <= MAX_UDP_PACKET_SIZE {
        return None;
    }

    let fragment_id = Uuid::new_v4().to_string();
    let chunks: Vec<&[u8]> = raw.chunks(MAX_UDP_PACKET_SIZE).collect();
    let total = chunks.len() as u32;

    Some(
        chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                FragmentPacket::build(&fragment_id, index as u32, total, chunk)
            })
            .collect(),
    )
}

struct FragmentSet {
    total: u32,
    parts: HashMap<u32, Vec<u8>>,
    created: Instant,
}

/// Inbound reassembly table.
pub struct Reassembler {
    table: Mutex<HashMap<(SocketAddr, String), FragmentSet>>,
    timeout: Duration,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::with_timeout(FRAGMENT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Feed one fragment. Returns the reassembled raw packet once all
    /// indices `0..total` are present.
    pub fn accept(&self, from: SocketAddr, fragment: &FragmentPacket) -> Option<Vec<u8>> {
        let key = (from, fragment.fragment_id.clone());
        let mut table = self.table.lock();

        let set = table.entry(key.clone()).or_insert_with(|| FragmentSet {
            total: fragment.total_fragments,
            parts: HashMap::new(),
            created: Instant::now(),
        });

        if set.total != fragment.total_fragments {
            warn!(
                fragment_id = %fragment.fragment_id,
                "fragment total mismatch ({} vs {}), ignoring",
                fragment.total_fragments,
                set.total
            );
            return None;
        }

        // Duplicate indices are idempotent
        set.parts
            .entry(fragment.fragment_index)
            .or_insert_with(|| fragment.data.clone());

        if set.parts.len() < set.total as usize {
            return None;
        }

        let set = table.remove(&key)?;
        let mut raw = Vec::new();
        for index in 0..set.total {
            raw.extend_from_slice(set.parts.get(&index)?);
        }
        debug!(fragment_id = %key.1, bytes = raw.len(), "reassembled packet");
        Some(raw)
    }

    /// Drop partial sets older than the timeout. Returns how many were
    /// evicted.
    pub fn evict_expired(&self) -> usize {
        let mut table = self.table.lock();
        let before = table.len();
        table.retain(|_, set| set.created.elapsed() < self.timeout);
        before - table.len()
    }

    pub fn pending_sets(&self) -> usize {
        self.table.lock().len()
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}
