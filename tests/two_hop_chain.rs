//! Two-hop onion chain construction and per-hop unwrap
//!
//! Builds a chain for `GET http://example.com/` exiting via R2, walks it
//! hop by hop, and checks that tampering R2's ciphertext trips the
//! integrity check at R2.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use veilnet_core::{
    HttpContents, RelayHop, RelayRecord, RequestData, RouteDescriptor, RoutingMap, VeilNetError,
};
use veilnet_crypto::RsaKeypair;
use veilnet_relay::{unwrap_layer, UnwrappedLayer};
use veilnet_routing::{build_routing_chain, ChainStrategy, Request};

fn relay_hop(id: &str, port: u16, keypair: &RsaKeypair) -> RelayHop {
    RelayHop::from_record(&RelayRecord::new(
        id,
        "127.0.0.1",
        port,
        keypair.public_pem.clone(),
    ))
}

fn two_hop_fixture() -> (RsaKeypair, RsaKeypair, RoutingMap) {
    let r1 = RsaKeypair::generate().unwrap();
    let r2 = RsaKeypair::generate().unwrap();
    let map = RoutingMap::new(vec![
        relay_hop("relay-1", 9101, &r1),
        relay_hop("relay-2", 9102, &r2),
    ]);
    (r1, r2, map)
}

#[tokio::test]
async fn chain_walks_r1_then_r2_to_the_literal_request() {
    let (r1, r2, map) = two_hop_fixture();

    let data = RequestData::http("http://example.com/", HttpContents::default());
    let mut request = Request::new(data, map);
    let outer = request
        .generate_routing_chain(ChainStrategy::Threaded)
        .await
        .unwrap()
        .clone();

    // Outer packet is addressed to R1
    assert_eq!(outer.relay_id, "relay-1");
    assert_eq!(outer.relay_port, 9101);
    let packet = request.to_ssu_packet().unwrap();
    assert_eq!(packet.addr.unwrap().port(), 9101);

    // R1 decrypts and finds a descriptor addressed to R2
    let UnwrappedLayer::Forward {
        next,
        descriptor_json,
    } = unwrap_layer(&outer, &r1.private_pem).unwrap()
    else {
        panic!("R1 must be a forwarding hop");
    };
    assert_eq!(next.relay_id, "relay-2");
    assert_eq!(next.relay_port, 9102);

    let middle = RouteDescriptor::from_json(&descriptor_json).unwrap();
    assert_eq!(middle.relay_id, "relay-2");
    assert!(middle.is_exit());

    // R2 decrypts the literal request bytes
    let UnwrappedLayer::Exit { payload } = unwrap_layer(&middle, &r2.private_pem).unwrap() else {
        panic!("R2 must be the exit hop");
    };
    assert_eq!(payload, "GET http://example.com/\r\n\r\n");
}

#[tokio::test]
async fn tampered_r2_ciphertext_fails_integrity_at_r2() {
    let (r1, r2, map) = two_hop_fixture();

    let payload = "GET http://example.com/\r\n\r\n";
    let outer = build_routing_chain(payload, &map, ChainStrategy::Threaded)
        .await
        .unwrap();

    let UnwrappedLayer::Forward {
        descriptor_json, ..
    } = unwrap_layer(&outer, &r1.private_pem).unwrap()
    else {
        panic!("R1 must forward");
    };
    let mut middle = RouteDescriptor::from_json(&descriptor_json).unwrap();

    // Flip one byte of R2's ciphertext
    let mut token = URL_SAFE.decode(&middle.route_data).unwrap();
    let mid = token.len() / 2;
    token[mid] ^= 0x01;
    middle.route_data = URL_SAFE.encode(token);

    let result = unwrap_layer(&middle, &r2.private_pem);
    assert!(
        matches!(result, Err(VeilNetError::Integrity(_))),
        "expected integrity failure, got {result:?}"
    );
}

#[tokio::test]
async fn r2_key_cannot_open_r1_layer() {
    let (_r1, r2, map) = two_hop_fixture();
    let outer = build_routing_chain("payload", &map, ChainStrategy::Threaded)
        .await
        .unwrap();
    assert!(unwrap_layer(&outer, &r2.private_pem).is_err());
}
