//! Request/response correlation
//!
//! An outbound request carries its uuid as a tag on the outer body; the
//! in-flight table maps that uuid to the waiter. Entries expire at the
//! node's connection timeout and are drained with a shutdown signal when
//! the node stops.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;
use veilnet_core::Packet;

use crate::SsuError;

/// One outbound SSU request.
#[derive(Debug)]
pub struct SsuRequest {
    pub payload: Packet,
    pub addr: SocketAddr,
    pub request_id: Uuid,
}

impl SsuRequest {
    pub fn new(payload: Packet, addr: SocketAddr) -> Self {
        Self {
            payload,
            addr,
            request_id: Uuid::new_v4(),
        }
    }
}

struct PendingEntry {
    tx: oneshot::Sender<std::result::Result<Packet, SsuError>>,
    created: Instant,
}

/// The in-flight table, safe under concurrent send/receive.
#[derive(Default)]
pub struct PendingTable {
    entries: Mutex<HashMap<Uuid, PendingEntry>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request id, returning the channel its response arrives on.
    pub fn insert(&self, id: Uuid) -> oneshot::Receiver<std::result::Result<Packet, SsuError>> {
        let (tx, rx) = oneshot::channel();
        self.entries.lock().insert(
            id,
            PendingEntry {
                tx,
                created: Instant::now(),
            },
        );
        rx
    }

    /// Deliver a response to its waiter. Returns false when no entry
    /// matches (late or unknown response).
    pub fn resolve(&self, id: Uuid, response: Packet) -> bool {
        let entry = self.entries.lock().remove(&id);
        match entry {
            Some(entry) => {
                if entry.tx.send(Ok(response)).is_err() {
                    debug!(request_id = %id, "waiter gone before response arrived");
                }
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &Uuid) {
        self.entries.lock().remove(id);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Expire entries older than `max_age`, signalling a timeout to any
    /// waiter still listening.
    pub fn sweep_expired(&self, max_age: Duration) -> usize {
        let mut expired = Vec::new();
        {
            let mut entries = self.entries.lock();
            let ids: Vec<Uuid> = entries
                .iter()
                .filter(|(_, e)| e.created.elapsed() >= max_age)
                .map(|(id, _)| *id)
                .collect();
            for id in ids {
                if let Some(entry) = entries.remove(&id) {
                    expired.push((id, entry));
                }
            }
        }
        let count = expired.len();
        for (id, entry) in expired {
            debug!(request_id = %id, "in-flight request expired");
            let _ = entry.tx.send(Err(SsuError::Timeout));
        }
        count
    }

    /// Cancel every waiter with a shutdown signal.
    pub fn drain_shutdown(&self) {
        let entries: Vec<PendingEntry> = {
            let mut map = self.entries.lock();
            map.drain().map(|(_, e)| e).collect()
        };
        for entry in entries {
            let _ = entry.tx.send(Err(SsuError::Shutdown));
        }
    }
}
