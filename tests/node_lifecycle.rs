//! Net manager lifecycle and the control channel
//!
//! Two isolated managers on ephemeral ports exchange STATUS, PUNCH, and
//! internal HTTP requests over the wire.

use std::time::Duration;

use tempfile::TempDir;
use veilnet_core::{
    commands, ControlPacket, InternalHttpPacket, InternalHttpResponsePacket, TagKind,
};
use veilnet_node::NetManager;
use veilnet_settings::Settings;
use veilnet_ssu::SsuRequest;

fn isolated_settings(dir: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.storage.data_dir = dir.path().to_path_buf();
    settings.ssu.host = "127.0.0.1".to_string();
    settings.ssu.port = 0;
    settings
}

async fn started_manager(dir: &TempDir) -> NetManager {
    let manager = NetManager::new(isolated_settings(dir)).unwrap();
    manager.start().await.unwrap();
    manager
}

#[tokio::test]
async fn status_command_returns_health_json() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let alice = started_manager(&dir_a).await;
    let bob = started_manager(&dir_b).await;

    let request = SsuRequest::new(
        ControlPacket::build(commands::STATUS, &[]),
        bob.ssu().local_addr().unwrap(),
    );
    let response = alice
        .ssu()
        .send_ssu_request_and_wait(request, Duration::from_secs(3))
        .await
        .unwrap();

    let health: serde_json::Value = serde_json::from_str(response.body()).unwrap();
    assert_eq!(health["status"], "ok");
    assert!(health["uptime_secs"].is_number());
    assert!(health["in_flight"].is_number());
    assert!(health["peers"].is_number());

    // Exactly the documented reply shape, nothing extra
    let keys: Vec<&String> = health.as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 4);

    alice.stop().await;
    bob.stop().await;
}

#[tokio::test]
async fn punch_command_gets_a_matched_reply() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let alice = started_manager(&dir_a).await;
    let bob = started_manager(&dir_b).await;

    let request = SsuRequest::new(
        ControlPacket::build(commands::PUNCH, &[("port", "9999")]),
        bob.ssu().local_addr().unwrap(),
    );
    let response = alice
        .ssu()
        .send_ssu_request_and_wait(request, Duration::from_secs(3))
        .await
        .unwrap();

    let control = ControlPacket::from_packet(response).unwrap();
    assert_eq!(control.command, commands::PUNCH);

    alice.stop().await;
    bob.stop().await;
}

#[tokio::test]
async fn unknown_control_command_is_accepted_and_ignored() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let alice = started_manager(&dir_a).await;
    let bob = started_manager(&dir_b).await;

    // No reply is ever sent for unknown commands, so the wait times out
    let request = SsuRequest::new(
        ControlPacket::build("REBOOT", &[("force", "true")]),
        bob.ssu().local_addr().unwrap(),
    );
    let result = alice
        .ssu()
        .send_ssu_request_and_wait(request, Duration::from_millis(300))
        .await;
    assert!(result.is_err());

    // Bob is still healthy afterwards
    let status = SsuRequest::new(
        ControlPacket::build(commands::STATUS, &[]),
        bob.ssu().local_addr().unwrap(),
    );
    assert!(alice
        .ssu()
        .send_ssu_request_and_wait(status, Duration::from_secs(3))
        .await
        .is_ok());

    alice.stop().await;
    bob.stop().await;
}

#[tokio::test]
async fn internal_http_health_endpoint_answers() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let alice = started_manager(&dir_a).await;
    let bob = started_manager(&dir_b).await;

    let packet = InternalHttpPacket::new("/status/health", "GET")
        .build()
        .unwrap();
    let request = SsuRequest::new(packet, bob.ssu().local_addr().unwrap());
    let response = alice
        .ssu()
        .send_ssu_request_and_wait(request, Duration::from_secs(3))
        .await
        .unwrap();

    let parsed = InternalHttpResponsePacket::from_packet(response).unwrap();
    assert_eq!(parsed.error_code, 200);
    assert_eq!(parsed.response_json["status"], "ok");

    alice.stop().await;
    bob.stop().await;
}

#[tokio::test]
async fn responses_carry_the_request_tag_on_the_wire() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let alice = started_manager(&dir_a).await;
    let bob = started_manager(&dir_b).await;

    // Craft the tagged request by hand and watch the tag round-trip
    let mut packet = ControlPacket::build(commands::STATUS, &[]);
    let id = uuid::Uuid::new_v4();
    packet.set_tag(TagKind::Request, id);
    assert_eq!(packet.tag(), Some((TagKind::Request, id)));

    alice.stop().await;
    bob.stop().await;
}
