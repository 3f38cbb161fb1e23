//! Onion route types
//!
//! A [`RoutingMap`] is the plaintext hop chain chosen for one request; it
//! is built once by the map generator and consumed in a single pass by the
//! chain builder. Positions in the arena are the linked-list order: hop 0
//! is the entry, the last hop is the exit.
//!
//! A [`RouteDescriptor`] is the wire form one hop receives: its ciphertext,
//! wrapped session key, integrity hash, and the address of the next hop
//! (`child_route`), with `None` marking the exit.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VeilNetError};
use crate::ri::RelayRecord;

/// Addressing triple for a hop, carried inside descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopAddress {
    pub relay_id: String,
    pub relay_ip: String,
    pub relay_port: u16,
}

impl HopAddress {
    pub fn addr_string(&self) -> String {
        format!("{}:{}", self.relay_ip, self.relay_port)
    }
}

/// One plaintext hop in a routing map.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayHop {
    pub relay_id: String,
    pub relay_ip: String,
    pub relay_port: u16,
    /// RSA public key, PKCS#1 PEM.
    pub public_key: String,
}

impl RelayHop {
    pub fn from_record(record: &RelayRecord) -> Self {
        Self {
            relay_id: record.relay_id.clone(),
            relay_ip: record.relay_ip.clone(),
            relay_port: record.relay_port,
            public_key: record.public_key.clone(),
        }
    }

    pub fn address(&self) -> HopAddress {
        HopAddress {
            relay_id: self.relay_id.clone(),
            relay_ip: self.relay_ip.clone(),
            relay_port: self.relay_port,
        }
    }
}

/// The ordered hop chain for one request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoutingMap {
    hops: Vec<RelayHop>,
}

impl RoutingMap {
    pub fn new(hops: Vec<RelayHop>) -> Self {
        Self { hops }
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn hops(&self) -> &[RelayHop] {
        &self.hops
    }

    /// Entry hop of the chain.
    pub fn first(&self) -> Option<&RelayHop> {
        self.hops.first()
    }

    /// The n-th hop after the head, mirroring child traversal.
    pub fn nth_child(&self, n: usize) -> Option<&RelayHop> {
        self.hops.get(n + 1)
    }

    /// Number of hops after the head.
    pub fn total_children(&self) -> usize {
        self.hops.len().saturating_sub(1)
    }
}

/// Wire descriptor for one hop of the encrypted chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub relay_id: String,
    pub relay_ip: String,
    pub relay_port: u16,
    /// Base64 Fernet token holding the next layer (or the inner payload at
    /// the exit hop).
    pub route_data: String,
    /// Base64 RSA-wrapped session key.
    pub encrypted_fernet: String,
    /// Hex SHA-256 of the plaintext behind `route_data`.
    pub encrypted_message_hash: String,
    /// Next hop, or `None` when this hop is the exit.
    pub child_route: Option<HopAddress>,
}

impl RouteDescriptor {
    pub fn is_exit(&self) -> bool {
        self.child_route.is_none()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| VeilNetError::Serialization(format!("bad route descriptor: {e}")))
    }

    pub fn address(&self) -> HopAddress {
        HopAddress {
            relay_id: self.relay_id.clone(),
            relay_ip: self.relay_ip.clone(),
            relay_port: self.relay_port,
        }
    }
}
