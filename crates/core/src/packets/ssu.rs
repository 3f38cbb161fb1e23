//! Generic SSU payload packet

use crate::error::{Result, VeilNetError};
use crate::packet::{header, Packet};

/// An `SSU`-headered packet with an opaque body. This is the carrier for
/// onion route descriptors and any application payload that needs no
/// further typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsuPacket {
    packet: Packet,
}

impl SsuPacket {
    /// Consume a generic packet, checking the header.
    pub fn from_packet(packet: Packet) -> Result<Self> {
        if !packet.has_header(header::SSU) {
            return Err(VeilNetError::Validation(format!(
                "not an SSU packet: {:?}",
                packet.header()
            )));
        }
        Ok(Self { packet })
    }

    /// Build a fresh SSU packet around a body.
    pub fn from_body(body: impl Into<String>) -> Self {
        let mut packet = Packet::from_text(body.into());
        packet.assemble_header(header::SSU);
        Self { packet }
    }

    pub fn body(&self) -> &str {
        self.packet.body()
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn into_packet(self) -> Packet {
        self.packet
    }
}
