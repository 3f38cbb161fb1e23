//! Propagation envelope packets
//!
//! A propagation packet wraps any other packet's full string form together
//! with flood-control counters. Depth 0 means deliver-only; a positive
//! depth is decremented at every hop that re-broadcasts.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VeilNetError};
use crate::packet::{header, Packet};

/// Default flood depth for new propagations.
pub const DEFAULT_PROPAGATION_DEPTH: u32 = 2;

/// Which routing-info peer set a propagation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TargetRi {
    #[serde(rename = "NRI")]
    Nri,
    #[serde(rename = "RRI")]
    Rri,
    #[serde(rename = "ALL")]
    #[default]
    All,
}

impl std::str::FromStr for TargetRi {
    type Err = VeilNetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NRI" => Ok(TargetRi::Nri),
            "RRI" => Ok(TargetRi::Rri),
            "ALL" => Ok(TargetRi::All),
            other => Err(VeilNetError::Validation(format!(
                "target_ri must be NRI, RRI or ALL, got {other}"
            ))),
        }
    }
}

fn default_target_depth() -> u32 {
    DEFAULT_PROPAGATION_DEPTH
}

/// The JSON body of a `PROPAGATION_PACKET`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationEnvelope {
    /// Full string form of the wrapped packet, header included.
    pub packet: String,
    pub current_depth: u32,
    #[serde(default = "default_target_depth")]
    pub target_depth: u32,
    #[serde(default)]
    pub target_ri: TargetRi,
}

impl PropagationEnvelope {
    pub fn wrap(inner: &Packet, depth: u32, target_ri: TargetRi) -> Self {
        Self {
            packet: inner.text().to_string(),
            current_depth: depth,
            target_depth: depth,
            target_ri,
        }
    }

    /// Rehydrate the wrapped packet.
    pub fn inner_packet(&self) -> Packet {
        Packet::from_text(self.packet.clone())
    }

    /// Copy of this envelope one hop further out.
    pub fn decremented(&self) -> Self {
        Self {
            current_depth: self.current_depth.saturating_sub(1),
            ..self.clone()
        }
    }
}

/// A parsed `PROPAGATION_PACKET`.
#[derive(Debug, Clone)]
pub struct PropagationPacket {
    packet: Packet,
    pub envelope: PropagationEnvelope,
}

impl PropagationPacket {
    pub fn from_packet(packet: Packet) -> Result<Self> {
        if !packet.has_header(header::PROPAGATION_PACKET) {
            return Err(VeilNetError::Validation(format!(
                "not a PROPAGATION_PACKET: {:?}",
                packet.header()
            )));
        }
        let envelope: PropagationEnvelope = serde_json::from_str(packet.body())?;
        Ok(Self { packet, envelope })
    }

    /// Serialize an envelope into a sendable packet.
    pub fn build(envelope: &PropagationEnvelope) -> Result<Packet> {
        let json = serde_json::to_string(envelope)?;
        let mut packet = Packet::from_text(json);
        packet.assemble_header(header::PROPAGATION_PACKET);
        Ok(packet)
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn into_packet(self) -> Packet {
        self.packet
    }
}
