//! Fragment packets for datagrams over the UDP size limit
//!
//! Body is JSON: `{fragment_id, fragment_index, total_fragments, data}`
//! with `data` hex-encoding one chunk of the original serialized packet.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VeilNetError};
use crate::packet::{header, Packet};

#[derive(Debug, Serialize, Deserialize)]
struct FragmentBody {
    fragment_id: String,
    fragment_index: u32,
    total_fragments: u32,
    data: String,
}

/// One fragment of a larger packet.
#[derive(Debug, Clone)]
pub struct FragmentPacket {
    packet: Packet,
    pub fragment_id: String,
    pub fragment_index: u32,
    pub total_fragments: u32,
    /// Decoded chunk bytes.
    pub data: Vec<u8>,
}

impl FragmentPacket {
    pub fn from_packet(packet: Packet) -> Result<Self> {
        if !packet.has_header(header::SSU_FRAGMENT) {
            return Err(VeilNetError::Validation(format!(
                "not an SSU_FRAGMENT packet: {:?}",
                packet.header()
            )));
        }
        let body: FragmentBody = serde_json::from_str(packet.body())?;
        if body.total_fragments == 0 {
            return Err(VeilNetError::Validation(
                "total_fragments must be at least 1".to_string(),
            ));
        }
        if body.fragment_index >= body.total_fragments {
            return Err(VeilNetError::Validation(format!(
                "fragment index {} out of range 0..{}",
                body.fragment_index, body.total_fragments
            )));
        }
        let data = hex::decode(&body.data)
            .map_err(|e| VeilNetError::Validation(format!("bad fragment hex: {e}")))?;
        Ok(Self {
            packet,
            fragment_id: body.fragment_id,
            fragment_index: body.fragment_index,
            total_fragments: body.total_fragments,
            data,
        })
    }

    /// Build one fragment datagram around a chunk of the original bytes.
    pub fn build(fragment_id: &str, index: u32, total: u32, chunk: &[u8]) -> Packet {
        let body = FragmentBody {
            fragment_id: fragment_id.to_string(),
            fragment_index: index,
            total_fragments: total,
            data: hex::encode(chunk),
        };
        // FragmentBody has no map keys that can fail to serialize
        let json = serde_json::to_string(&body).unwrap_or_default();
        let mut packet = Packet::from_text(json);
        packet.assemble_header(header::SSU_FRAGMENT);
        packet
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn into_packet(self) -> Packet {
        self.packet
    }
}
