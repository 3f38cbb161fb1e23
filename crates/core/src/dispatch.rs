//! Header-to-variant packet dispatch
//!
//! The tagged-variant counterpart of a runtime class table: a received
//! generic packet is upgraded into its typed form by matching the header
//! token. An unregistered header leaves the packet plain.

use crate::error::Result;
use crate::packet::{header, Packet};
use crate::packets::control::ControlPacket;
use crate::packets::dns::DnsPacket;
use crate::packets::fragment::FragmentPacket;
use crate::packets::http::{InternalHttpPacket, InternalHttpResponsePacket};
use crate::packets::propagation::PropagationPacket;
use crate::packets::ssu::SsuPacket;

/// A packet in its typed form.
#[derive(Debug, Clone)]
pub enum TypedPacket {
    /// No registered header; kept as-is.
    Plain(Packet),
    Ssu(SsuPacket),
    Control(ControlPacket),
    Fragment(FragmentPacket),
    Dns(DnsPacket),
    InternalHttp(InternalHttpPacket),
    InternalHttpResponse(InternalHttpResponsePacket),
    Propagation(PropagationPacket),
}

impl TypedPacket {
    /// The header token this variant dispatches on, if any.
    pub fn header(&self) -> Option<&'static str> {
        match self {
            TypedPacket::Plain(_) => None,
            TypedPacket::Ssu(_) => Some(header::SSU),
            TypedPacket::Control(_) => Some(header::SSU_CONTROL),
            TypedPacket::Fragment(_) => Some(header::SSU_FRAGMENT),
            TypedPacket::Dns(_) => Some(header::DNS),
            TypedPacket::InternalHttp(_) => Some(header::INTERNAL_HTTP_PACKET),
            TypedPacket::InternalHttpResponse(_) => {
                Some(header::INTERNAL_HTTP_PACKET_RESPONSE)
            }
            TypedPacket::Propagation(_) => Some(header::PROPAGATION_PACKET),
        }
    }

    /// Recover the underlying generic packet, byte-identical to what was
    /// upgraded.
    pub fn into_packet(self) -> Packet {
        match self {
            TypedPacket::Plain(p) => p,
            TypedPacket::Ssu(p) => p.into_packet(),
            TypedPacket::Control(p) => p.into_packet(),
            TypedPacket::Fragment(p) => p.into_packet(),
            TypedPacket::Dns(p) => p.into_packet(),
            // Parsed HTTP packets always carry their source packet, so the
            // rebuild branch is never hit on this path.
            TypedPacket::InternalHttp(p) => match p.into_packet() {
                Ok(packet) => packet,
                Err(_) => Packet::from_text(String::new()),
            },
            TypedPacket::InternalHttpResponse(p) => match p.into_packet() {
                Ok(packet) => packet,
                Err(_) => Packet::from_text(String::new()),
            },
            TypedPacket::Propagation(p) => p.into_packet(),
        }
    }
}

/// Upgrade a generic packet into its typed variant by header lookup.
///
/// Fails only when a registered header carries a malformed body; the
/// receive loop logs and drops those.
pub fn upgrade(packet: Packet) -> Result<TypedPacket> {
    match packet.header() {
        Some(header::SSU_CONTROL) => ControlPacket::from_packet(packet).map(TypedPacket::Control),
        Some(header::SSU_FRAGMENT) => {
            FragmentPacket::from_packet(packet).map(TypedPacket::Fragment)
        }
        Some(header::DNS) => DnsPacket::from_packet(packet).map(TypedPacket::Dns),
        Some(header::INTERNAL_HTTP_PACKET) => {
            InternalHttpPacket::from_packet(packet).map(TypedPacket::InternalHttp)
        }
        Some(header::INTERNAL_HTTP_PACKET_RESPONSE) => {
            InternalHttpResponsePacket::from_packet(packet)
                .map(TypedPacket::InternalHttpResponse)
        }
        Some(header::PROPAGATION_PACKET) => {
            PropagationPacket::from_packet(packet).map(TypedPacket::Propagation)
        }
        Some(header::SSU) => SsuPacket::from_packet(packet).map(TypedPacket::Ssu),
        _ => Ok(TypedPacket::Plain(packet)),
    }
}
