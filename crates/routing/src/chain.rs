//! Onion chain construction
//!
//! Built inside-out: the innermost plaintext is the serialized request
//! payload, encrypted to the exit hop; each outer plaintext is the full
//! JSON descriptor of the hop inside it. The outermost descriptor is what
//! the SSU node emits to the first hop.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::warn;
use veilnet_core::{HopAddress, RelayHop, Result, RouteDescriptor, RoutingMap, VeilNetError};
use veilnet_crypto::{hybrid_encrypt_with_hash, CryptoError};

/// Layers processed between yields in `batched` mode.
pub const CHAIN_BATCH_SIZE: usize = 4;

/// How layer encryption is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStrategy {
    /// Offload the per-layer RSA/AES work to the blocking pool.
    Threaded,
    /// Strictly sequential on the current task, in fixed-size groups.
    Batched,
}

pub const DEFAULT_CHAIN_STRATEGY: ChainStrategy = ChainStrategy::Threaded;

impl ChainStrategy {
    /// Parse a strategy name; unknown names warn and fall back to
    /// `threaded`.
    pub fn parse(name: &str) -> Self {
        match name {
            "threaded" => ChainStrategy::Threaded,
            "batched" => ChainStrategy::Batched,
            other => {
                warn!("unknown routing chain strategy {other:?}, defaulting to threaded");
                DEFAULT_CHAIN_STRATEGY
            }
        }
    }
}

fn crypto_error(err: CryptoError) -> VeilNetError {
    match err {
        CryptoError::KeyFormat(msg) => VeilNetError::Validation(format!("relay key: {msg}")),
        CryptoError::Integrity => VeilNetError::Integrity("layer encryption".to_string()),
        other => VeilNetError::Transport(format!("crypto: {other}")),
    }
}

/// Encrypt one layer: `plaintext` sealed to `hop`, pointing at `child`.
fn encrypt_layer(
    plaintext: &str,
    hop: &RelayHop,
    child: Option<HopAddress>,
) -> Result<RouteDescriptor> {
    let (route_data, message_hash, wrapped_key) =
        hybrid_encrypt_with_hash(plaintext, &hop.public_key).map_err(crypto_error)?;

    Ok(RouteDescriptor {
        relay_id: hop.relay_id.clone(),
        relay_ip: hop.relay_ip.clone(),
        relay_port: hop.relay_port,
        route_data,
        encrypted_fernet: STANDARD.encode(wrapped_key),
        encrypted_message_hash: message_hash,
        child_route: child,
    })
}

fn build_chain_sync(payload: &str, hops: &[RelayHop]) -> Result<RouteDescriptor> {
    let mut plaintext = payload.to_string();
    let mut child: Option<HopAddress> = None;
    let mut outermost: Option<RouteDescriptor> = None;

    for hop in hops.iter().rev() {
        let descriptor = encrypt_layer(&plaintext, hop, child.take())?;
        child = Some(hop.address());
        plaintext = descriptor.to_json()?;
        outermost = Some(descriptor);
    }

    outermost.ok_or(VeilNetError::NoRelaysAvailable)
}

async fn build_chain_batched(payload: &str, hops: &[RelayHop]) -> Result<RouteDescriptor> {
    let mut plaintext = payload.to_string();
    let mut child: Option<HopAddress> = None;
    let mut outermost: Option<RouteDescriptor> = None;

    for (processed, hop) in hops.iter().rev().enumerate() {
        if processed > 0 && processed % CHAIN_BATCH_SIZE == 0 {
            // Let the executor breathe between groups
            tokio::task::yield_now().await;
        }
        let descriptor = encrypt_layer(&plaintext, hop, child.take())?;
        child = Some(hop.address());
        plaintext = descriptor.to_json()?;
        outermost = Some(descriptor);
    }

    outermost.ok_or(VeilNetError::NoRelaysAvailable)
}

/// Build the encrypted chain for a payload over a routing map.
///
/// Both strategies produce structurally identical chains; they differ only
/// in where the CPU work runs.
pub async fn build_routing_chain(
    payload: &str,
    map: &RoutingMap,
    strategy: ChainStrategy,
) -> Result<RouteDescriptor> {
    if map.is_empty() {
        return Err(VeilNetError::NoRelaysAvailable);
    }

    match strategy {
        ChainStrategy::Threaded => {
            let payload = payload.to_string();
            let hops = map.hops().to_vec();
            tokio::task::spawn_blocking(move || build_chain_sync(&payload, &hops))
                .await
                .map_err(|e| VeilNetError::Transport(format!("chain worker died: {e}")))?
        }
        ChainStrategy::Batched => build_chain_batched(payload, map.hops()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veilnet_core::RelayRecord;
    use veilnet_crypto::{hybrid_decrypt, sha256_hex, RsaKeypair};

    fn hop_with_key(id: &str, port: u16, keypair: &RsaKeypair) -> RelayHop {
        RelayHop::from_record(&RelayRecord::new(
            id,
            "127.0.0.1",
            port,
            keypair.public_pem.clone(),
        ))
    }

    fn unwrap_with(descriptor: &RouteDescriptor, keypair: &RsaKeypair) -> String {
        let wrapped = STANDARD.decode(&descriptor.encrypted_fernet).unwrap();
        let plaintext =
            hybrid_decrypt(&descriptor.route_data, &keypair.private_pem, &wrapped).unwrap();
        assert_eq!(
            sha256_hex(plaintext.as_bytes()),
            descriptor.encrypted_message_hash
        );
        plaintext
    }

    #[test]
    fn test_strategy_parse_falls_back_to_threaded() {
        assert_eq!(ChainStrategy::parse("threaded"), ChainStrategy::Threaded);
        assert_eq!(ChainStrategy::parse("batched"), ChainStrategy::Batched);
        assert_eq!(ChainStrategy::parse("mystery"), ChainStrategy::Threaded);
    }

    #[tokio::test]
    async fn test_empty_map_is_an_error() {
        let map = RoutingMap::default();
        let result = build_routing_chain("payload", &map, ChainStrategy::Threaded).await;
        assert!(matches!(result, Err(VeilNetError::NoRelaysAvailable)));
    }

    #[tokio::test]
    async fn test_single_hop_chain_is_exit() {
        let keypair = RsaKeypair::generate().unwrap();
        let map = RoutingMap::new(vec![hop_with_key("relay-1", 9001, &keypair)]);

        let chain = build_routing_chain("GET http://example.com/\r\n\r\n", &map, ChainStrategy::Threaded)
            .await
            .unwrap();

        assert_eq!(chain.relay_id, "relay-1");
        assert!(chain.is_exit());
        assert_eq!(
            unwrap_with(&chain, &keypair),
            "GET http://example.com/\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn test_two_hop_chain_unwraps_in_order() {
        let kp1 = RsaKeypair::generate().unwrap();
        let kp2 = RsaKeypair::generate().unwrap();
        let map = RoutingMap::new(vec![
            hop_with_key("relay-1", 9001, &kp1),
            hop_with_key("relay-2", 9002, &kp2),
        ]);

        let chain = build_routing_chain("inner payload", &map, ChainStrategy::Threaded)
            .await
            .unwrap();

        // Outermost layer belongs to hop 1 and points at hop 2
        assert_eq!(chain.relay_id, "relay-1");
        let child = chain.child_route.clone().unwrap();
        assert_eq!(child.relay_id, "relay-2");

        // Hop 1 reveals hop 2's descriptor
        let middle = RouteDescriptor::from_json(&unwrap_with(&chain, &kp1)).unwrap();
        assert_eq!(middle.relay_id, "relay-2");
        assert!(middle.is_exit());

        // Hop 2 reveals the payload
        assert_eq!(unwrap_with(&middle, &kp2), "inner payload");
    }

    #[tokio::test]
    async fn test_strategies_build_equivalent_chains() {
        let kp1 = RsaKeypair::generate().unwrap();
        let kp2 = RsaKeypair::generate().unwrap();
        let kp3 = RsaKeypair::generate().unwrap();
        let map = RoutingMap::new(vec![
            hop_with_key("relay-1", 9001, &kp1),
            hop_with_key("relay-2", 9002, &kp2),
            hop_with_key("relay-3", 9003, &kp3),
        ]);

        let threaded = build_routing_chain("payload", &map, ChainStrategy::Threaded)
            .await
            .unwrap();
        let batched = build_routing_chain("payload", &map, ChainStrategy::Batched)
            .await
            .unwrap();

        // Ciphertexts differ (fresh keys) but the structure must match
        for chain in [&threaded, &batched] {
            assert_eq!(chain.relay_id, "relay-1");
            let middle = RouteDescriptor::from_json(&unwrap_with(
                chain,
                &kp1,
            ))
            .unwrap();
            assert_eq!(middle.relay_id, "relay-2");
            let inner = RouteDescriptor::from_json(&unwrap_with(&middle, &kp2)).unwrap();
            assert_eq!(inner.relay_id, "relay-3");
            assert!(inner.is_exit());
            assert_eq!(unwrap_with(&inner, &kp3), "payload");
        }
    }

    #[tokio::test]
    async fn test_unparseable_relay_key_fails_validation() {
        let map = RoutingMap::new(vec![RelayHop {
            relay_id: "relay-1".to_string(),
            relay_ip: "127.0.0.1".to_string(),
            relay_port: 9001,
            public_key: "-----BEGIN RSA PUBLIC KEY-----\ngarbage\n-----END RSA PUBLIC KEY-----\n"
                .to_string(),
        }]);
        let result = build_routing_chain("payload", &map, ChainStrategy::Threaded).await;
        assert!(matches!(result, Err(VeilNetError::Validation(_))));
    }
}
