//! The relay hook
//!
//! Bound to the `SSU` header. A body that parses as a route descriptor is
//! a chain layer addressed to this hop: unwrap it, then either forward the
//! revealed descriptor to the next hop as a fresh tagged request (so the
//! response can ride the reverse chain), or execute the inner request at
//! the exit and reply upstream.

use std::sync::Weak;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use veilnet_core::{
    parse_addr, InternalHttpResponsePacket, Result, RouteDescriptor, SsuPacket, TypedPacket,
    VeilNetError,
};
use veilnet_ssu::{HandlerContext, PacketHandler, SsuNode, SsuRequest};

use crate::exit::{parse_exit_payload, ExitClient};
use crate::unwrap::{unwrap_layer, UnwrappedLayer};

pub struct RelayHandler {
    node: Weak<SsuNode>,
    private_pem: String,
    exit: ExitClient,
}

impl RelayHandler {
    pub fn new(node: Weak<SsuNode>, private_pem: String) -> Result<Self> {
        Ok(Self {
            node,
            private_pem,
            exit: ExitClient::new()?,
        })
    }

    fn node(&self) -> Result<std::sync::Arc<SsuNode>> {
        self.node.upgrade().ok_or(VeilNetError::Shutdown)
    }
}

#[async_trait]
impl PacketHandler for RelayHandler {
    async fn handle(&self, packet: TypedPacket, ctx: HandlerContext) -> Result<()> {
        let TypedPacket::Ssu(ssu) = packet else {
            debug!("relay hook ignoring non-SSU packet");
            return Ok(());
        };

        let descriptor = match RouteDescriptor::from_json(ssu.body()) {
            Ok(descriptor) => descriptor,
            Err(_) => {
                // Plain SSU traffic, not a chain layer
                debug!(peer = %ctx.peer, "SSU body is not a route descriptor, ignoring");
                return Ok(());
            }
        };

        match unwrap_layer(&descriptor, &self.private_pem)? {
            UnwrappedLayer::Forward {
                next,
                descriptor_json,
            } => {
                let node = self.node()?;
                let addr = parse_addr(&next.addr_string())?;
                let packet = SsuPacket::from_body(descriptor_json).into_packet();
                let request = SsuRequest::new(packet, addr);

                debug!(next = %next.relay_id, %addr, "forwarding chain layer");
                let timeout = node.config().connection_timeout;
                match node.send_ssu_request_and_wait(request, timeout).await {
                    Ok(response) => {
                        // Relay the downstream answer back along the
                        // reverse chain
                        ctx.reply(response).await?;
                    }
                    Err(veilnet_ssu::SsuError::Timeout) => {
                        debug!(next = %next.relay_id, "no response from next hop");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            UnwrappedLayer::Exit { payload } => {
                let request = parse_exit_payload(&payload)?;
                info!(method = %request.method, url = %request.url, "exit hop executing request");
                let (status, body) = match self.exit.execute(&request).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!("exit request failed: {e}");
                        (502, serde_json::json!({ "error": e.to_string() }))
                    }
                };
                let response = InternalHttpResponsePacket::new(status, body).build()?;
                ctx.reply(response).await?;
            }
        }

        Ok(())
    }
}
