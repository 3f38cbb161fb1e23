//! The per-hop unwrap rule

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use veilnet_core::{HopAddress, Result, RouteDescriptor, VeilNetError};
use veilnet_crypto::{hybrid_decrypt, sha256_hex, CryptoError};

/// What one layer reveals at the hop that owns it.
#[derive(Debug)]
pub enum UnwrappedLayer {
    /// The plaintext is the next hop's descriptor; emit it to `next`.
    Forward {
        next: HopAddress,
        descriptor_json: String,
    },
    /// Terminal hop: the plaintext is the inner request payload.
    Exit { payload: String },
}

fn crypto_error(err: CryptoError) -> VeilNetError {
    match err {
        CryptoError::Integrity => {
            VeilNetError::Integrity("layer authentication failed".to_string())
        }
        CryptoError::KeyFormat(msg) => VeilNetError::Validation(msg),
        other => VeilNetError::Transport(format!("layer decrypt: {other}")),
    }
}

/// Unwrap one onion layer with this hop's private key.
///
/// Drops with an integrity error when either the token MAC or the
/// plaintext digest does not check out.
pub fn unwrap_layer(descriptor: &RouteDescriptor, private_pem: &str) -> Result<UnwrappedLayer> {
    let wrapped_key = STANDARD
        .decode(&descriptor.encrypted_fernet)
        .map_err(|e| VeilNetError::Validation(format!("bad wrapped key base64: {e}")))?;

    let plaintext = hybrid_decrypt(&descriptor.route_data, private_pem, &wrapped_key)
        .map_err(crypto_error)?;

    let digest = sha256_hex(plaintext.as_bytes());
    if digest != descriptor.encrypted_message_hash {
        return Err(VeilNetError::Integrity(format!(
            "plaintext digest mismatch at {}",
            descriptor.relay_id
        )));
    }

    match &descriptor.child_route {
        Some(next) => {
            // Confirm the revealed plaintext really is the next descriptor
            let revealed = RouteDescriptor::from_json(&plaintext)?;
            if revealed.relay_id != next.relay_id {
                return Err(VeilNetError::Integrity(format!(
                    "revealed descriptor {} does not match child route {}",
                    revealed.relay_id, next.relay_id
                )));
            }
            Ok(UnwrappedLayer::Forward {
                next: next.clone(),
                descriptor_json: plaintext,
            })
        }
        None => Ok(UnwrappedLayer::Exit { payload: plaintext }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veilnet_core::{RelayHop, RelayRecord};
    use veilnet_crypto::{hybrid_encrypt_with_hash, RsaKeypair};

    // Chain construction lives in the routing crate; rebuild a minimal
    // chain here without that dependency.
    fn build_chain(payload: &str, hops: &[(RelayHop, &RsaKeypair)]) -> RouteDescriptor {
        let mut plaintext = payload.to_string();
        let mut child: Option<HopAddress> = None;
        let mut outermost = None;
        for (hop, _) in hops.iter().rev() {
            let (route_data, hash, wrapped) =
                hybrid_encrypt_with_hash(&plaintext, &hop.public_key).unwrap();
            let descriptor = RouteDescriptor {
                relay_id: hop.relay_id.clone(),
                relay_ip: hop.relay_ip.clone(),
                relay_port: hop.relay_port,
                route_data,
                encrypted_fernet: STANDARD.encode(wrapped),
                encrypted_message_hash: hash,
                child_route: child.take(),
            };
            child = Some(hop.address());
            plaintext = descriptor.to_json().unwrap();
            outermost = Some(descriptor);
        }
        outermost.unwrap()
    }

    fn hop(id: &str, port: u16, keypair: &RsaKeypair) -> RelayHop {
        RelayHop::from_record(&RelayRecord::new(
            id,
            "127.0.0.1",
            port,
            keypair.public_pem.clone(),
        ))
    }

    #[test]
    fn test_exit_layer_reveals_payload() {
        let keypair = RsaKeypair::generate().unwrap();
        let chain = build_chain(
            "GET http://example.com/\r\n\r\n",
            &[(hop("relay-1", 9001, &keypair), &keypair)],
        );

        match unwrap_layer(&chain, &keypair.private_pem).unwrap() {
            UnwrappedLayer::Exit { payload } => {
                assert_eq!(payload, "GET http://example.com/\r\n\r\n")
            }
            other => panic!("expected exit, got {other:?}"),
        }
    }

    #[test]
    fn test_forward_layer_reveals_next_descriptor() {
        let kp1 = RsaKeypair::generate().unwrap();
        let kp2 = RsaKeypair::generate().unwrap();
        let chain = build_chain(
            "payload",
            &[
                (hop("relay-1", 9001, &kp1), &kp1),
                (hop("relay-2", 9002, &kp2), &kp2),
            ],
        );

        let layer = unwrap_layer(&chain, &kp1.private_pem).unwrap();
        let UnwrappedLayer::Forward {
            next,
            descriptor_json,
        } = layer
        else {
            panic!("expected forward");
        };
        assert_eq!(next.relay_id, "relay-2");
        assert_eq!(next.relay_port, 9002);

        let inner = RouteDescriptor::from_json(&descriptor_json).unwrap();
        match unwrap_layer(&inner, &kp2.private_pem).unwrap() {
            UnwrappedLayer::Exit { payload } => assert_eq!(payload, "payload"),
            other => panic!("expected exit, got {other:?}"),
        }
    }

    #[test]
    fn test_tampered_ciphertext_is_integrity_error() {
        let keypair = RsaKeypair::generate().unwrap();
        let mut chain = build_chain("payload", &[(hop("relay-1", 9001, &keypair), &keypair)]);

        // Flip one character of the token body
        let mut token = chain.route_data.clone().into_bytes();
        let mid = token.len() / 2;
        token[mid] = if token[mid] == b'A' { b'B' } else { b'A' };
        chain.route_data = String::from_utf8(token).unwrap();

        assert!(matches!(
            unwrap_layer(&chain, &keypair.private_pem),
            Err(VeilNetError::Integrity(_)) | Err(VeilNetError::Transport(_))
        ));
    }

    #[test]
    fn test_wrong_key_cannot_unwrap() {
        let keypair = RsaKeypair::generate().unwrap();
        let wrong = RsaKeypair::generate().unwrap();
        let chain = build_chain("payload", &[(hop("relay-1", 9001, &keypair), &keypair)]);
        assert!(unwrap_layer(&chain, &wrong.private_pem).is_err());
    }

    #[test]
    fn test_stored_hash_mismatch_is_integrity_error() {
        let keypair = RsaKeypair::generate().unwrap();
        let mut chain = build_chain("payload", &[(hop("relay-1", 9001, &keypair), &keypair)]);
        chain.encrypted_message_hash = "00".repeat(32);
        assert!(matches!(
            unwrap_layer(&chain, &keypair.private_pem),
            Err(VeilNetError::Integrity(_))
        ));
    }
}
