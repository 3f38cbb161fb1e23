//! Packet hooks
//!
//! A hook is bound per header token; the node upgrades each reassembled
//! datagram and hands the typed packet to the hook on a worker task. Hooks
//! reply through the [`HandlerContext`], which echoes the request's
//! correlation tag so the peer's waiter can match the response.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use uuid::Uuid;
use veilnet_core::{Packet, TagKind, TypedPacket};

use crate::fragment::fragment_raw;
use crate::{Result, SsuError};

/// Cheap cloneable sending half of the node's socket.
#[derive(Clone)]
pub struct SsuSender {
    socket: Arc<UdpSocket>,
}

impl SsuSender {
    pub(crate) fn new(socket: Arc<UdpSocket>) -> Self {
        Self { socket }
    }

    /// Emit a packet to its address, fragmenting when oversized.
    pub async fn send_packet(&self, packet: &Packet) -> Result<()> {
        let addr = packet.addr.ok_or(SsuError::NoAddress)?;
        match fragment_raw(packet.raw()) {
            Some(fragments) => {
                for fragment in &fragments {
                    self.socket
                        .send_to(fragment.raw(), addr)
                        .await
                        .map_err(SsuError::Send)?;
                }
            }
            None => {
                self.socket
                    .send_to(packet.raw(), addr)
                    .await
                    .map_err(SsuError::Send)?;
            }
        }
        Ok(())
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }
}

/// Everything a hook needs to act on one inbound packet.
#[derive(Clone)]
pub struct HandlerContext {
    pub sender: SsuSender,
    /// Where the packet came from.
    pub peer: SocketAddr,
    /// Correlation id of the inbound request, if it carried one.
    pub request_tag: Option<Uuid>,
}

impl HandlerContext {
    /// Send a packet back to the peer, echoing the correlation tag.
    pub async fn reply(&self, mut packet: Packet) -> Result<()> {
        if let Some(id) = self.request_tag {
            packet.set_tag(TagKind::Response, id);
        }
        packet.addr = Some(self.peer);
        self.sender.send_packet(&packet).await
    }
}

/// A header-keyed packet hook.
#[async_trait]
pub trait PacketHandler: Send + Sync {
    async fn handle(&self, packet: TypedPacket, ctx: HandlerContext) -> veilnet_core::Result<()>;
}
