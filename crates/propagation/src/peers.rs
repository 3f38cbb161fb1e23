//! Known-peer lists, split by routing-info kind

use std::collections::BTreeSet;
use std::net::SocketAddr;

use parking_lot::RwLock;
use veilnet_core::TargetRi;

/// Addresses of known NRI peers and RRI relays.
#[derive(Default)]
pub struct PeerDirectory {
    nri: RwLock<BTreeSet<SocketAddr>>,
    rri: RwLock<BTreeSet<SocketAddr>>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_nri_peer(&self, addr: SocketAddr) {
        self.nri.write().insert(addr);
    }

    pub fn add_rri_peer(&self, addr: SocketAddr) {
        self.rri.write().insert(addr);
    }

    pub fn remove_peer(&self, addr: &SocketAddr) {
        self.nri.write().remove(addr);
        self.rri.write().remove(addr);
    }

    /// Peers of the selected kind; `All` is the union, deduplicated.
    pub fn select(&self, target: TargetRi) -> Vec<SocketAddr> {
        match target {
            TargetRi::Nri => self.nri.read().iter().copied().collect(),
            TargetRi::Rri => self.rri.read().iter().copied().collect(),
            TargetRi::All => {
                let mut all: BTreeSet<SocketAddr> = self.nri.read().clone();
                all.extend(self.rri.read().iter().copied());
                all.into_iter().collect()
            }
        }
    }

    pub fn nri_count(&self) -> usize {
        self.nri.read().len()
    }

    pub fn rri_count(&self) -> usize {
        self.rri.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn test_select_by_kind() {
        let peers = PeerDirectory::new();
        peers.add_nri_peer(addr(1));
        peers.add_rri_peer(addr(2));
        peers.add_rri_peer(addr(3));

        assert_eq!(peers.select(TargetRi::Nri), vec![addr(1)]);
        assert_eq!(peers.select(TargetRi::Rri), vec![addr(2), addr(3)]);
        assert_eq!(peers.select(TargetRi::All).len(), 3);
    }

    #[test]
    fn test_all_deduplicates_shared_addresses() {
        let peers = PeerDirectory::new();
        peers.add_nri_peer(addr(1));
        peers.add_rri_peer(addr(1));
        assert_eq!(peers.select(TargetRi::All), vec![addr(1)]);
    }

    #[test]
    fn test_add_is_idempotent_and_remove_clears_both() {
        let peers = PeerDirectory::new();
        peers.add_nri_peer(addr(1));
        peers.add_nri_peer(addr(1));
        peers.add_rri_peer(addr(1));
        assert_eq!(peers.nri_count(), 1);

        peers.remove_peer(&addr(1));
        assert_eq!(peers.nri_count(), 0);
        assert_eq!(peers.rri_count(), 0);
    }
}
