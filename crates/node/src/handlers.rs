//! Built-in hooks: control channel and internal HTTP

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};
use veilnet_core::{
    commands, ControlPacket, InternalHttpResponsePacket, Result, SsuPacket, TypedPacket,
};
use veilnet_propagation::PeerDirectory;
use veilnet_ssu::{HandlerContext, PacketHandler, SsuNode};

/// Answers `SSU_CONTROL` commands. Unknown commands are accepted, logged,
/// and not acted on.
pub struct ControlHandler {
    node: Weak<SsuNode>,
    peers: Arc<PeerDirectory>,
}

impl ControlHandler {
    pub fn new(node: Weak<SsuNode>, peers: Arc<PeerDirectory>) -> Self {
        Self { node, peers }
    }
}

#[async_trait]
impl PacketHandler for ControlHandler {
    async fn handle(&self, packet: TypedPacket, ctx: HandlerContext) -> Result<()> {
        let TypedPacket::Control(control) = packet else {
            debug!("control hook ignoring non-control packet");
            return Ok(());
        };

        match control.command.as_str() {
            commands::STATUS => {
                let stats = self.node.upgrade().map(|node| node.stats());
                let health = match stats {
                    Some(stats) => json!({
                        "status": "ok",
                        "uptime_secs": stats.uptime_secs,
                        "in_flight": stats.in_flight,
                        "peers": self.peers.nri_count() + self.peers.rri_count(),
                    }),
                    None => json!({ "status": "stopping" }),
                };
                ctx.reply(SsuPacket::from_body(health.to_string()).into_packet())
                    .await?;
            }
            commands::PUNCH => {
                // NAT hole punch wants a matched reply, nothing more
                debug!(peer = %ctx.peer, "punch request");
                ctx.reply(ControlPacket::build(commands::PUNCH, &[])).await?;
            }
            other => {
                warn!(command = other, peer = %ctx.peer, "unknown control command, ignoring");
            }
        }
        Ok(())
    }
}

/// Answers `INTERNAL_HTTP_PACKET` requests with a response packet carrying
/// the correlation tag of the request.
#[derive(Default)]
pub struct InternalHttpHandler;

impl InternalHttpHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PacketHandler for InternalHttpHandler {
    async fn handle(&self, packet: TypedPacket, ctx: HandlerContext) -> Result<()> {
        let TypedPacket::InternalHttp(request) = packet else {
            debug!("internal-http hook ignoring unrelated packet");
            return Ok(());
        };

        let (code, body) = match request.endpoint.as_str() {
            "/status/health" => (200, json!({ "status": "ok" })),
            endpoint => (
                404,
                json!({ "error": format!("unknown endpoint: {endpoint}") }),
            ),
        };

        debug!(endpoint = %request.endpoint, method = %request.method, code, "internal http request");
        let response = InternalHttpResponsePacket::new(code, body).build()?;
        ctx.reply(response).await?;
        Ok(())
    }
}
