//! Internal HTTP packets
//!
//! Tunnel admin-style calls between nodes over SSU instead of an HTTP
//! listener: a request names an endpoint and method, the response carries a
//! status code and a JSON payload. Correlation uses the standard packet
//! tags.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, VeilNetError};
use crate::packet::{header, Packet};

/// An `INTERNAL_HTTP_PACKET` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalHttpPacket {
    #[serde(skip)]
    packet: Option<Packet>,
    pub endpoint: String,
    pub method: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub post_data: Map<String, Value>,
}

impl InternalHttpPacket {
    pub fn new(endpoint: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            packet: None,
            endpoint: endpoint.into(),
            method: method.into(),
            params: Map::new(),
            post_data: Map::new(),
        }
    }

    pub fn from_packet(packet: Packet) -> Result<Self> {
        if !packet.has_header(header::INTERNAL_HTTP_PACKET) {
            return Err(VeilNetError::Validation(format!(
                "not an INTERNAL_HTTP_PACKET: {:?}",
                packet.header()
            )));
        }
        let mut parsed: Self = serde_json::from_str(packet.body())?;
        parsed.packet = Some(packet);
        Ok(parsed)
    }

    pub fn build(&self) -> Result<Packet> {
        let json = serde_json::to_string(self)?;
        let mut packet = Packet::from_text(json);
        packet.assemble_header(header::INTERNAL_HTTP_PACKET);
        Ok(packet)
    }

    pub fn packet(&self) -> Option<&Packet> {
        self.packet.as_ref()
    }

    pub fn into_packet(self) -> Result<Packet> {
        match self.packet {
            Some(packet) => Ok(packet),
            None => self.build(),
        }
    }
}

/// An `INTERNAL_HTTP_PACKET_RESPONSE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalHttpResponsePacket {
    #[serde(skip)]
    packet: Option<Packet>,
    #[serde(default)]
    pub error_code: u16,
    #[serde(default)]
    pub response_json: Value,
}

impl InternalHttpResponsePacket {
    pub fn new(error_code: u16, response_json: Value) -> Self {
        Self {
            packet: None,
            error_code,
            response_json,
        }
    }

    pub fn from_packet(packet: Packet) -> Result<Self> {
        if !packet.has_header(header::INTERNAL_HTTP_PACKET_RESPONSE) {
            return Err(VeilNetError::Validation(format!(
                "not an INTERNAL_HTTP_PACKET_RESPONSE: {:?}",
                packet.header()
            )));
        }
        let mut parsed: Self = serde_json::from_str(packet.body())?;
        parsed.packet = Some(packet);
        Ok(parsed)
    }

    pub fn build(&self) -> Result<Packet> {
        let json = serde_json::to_string(self)?;
        let mut packet = Packet::from_text(json);
        packet.assemble_header(header::INTERNAL_HTTP_PACKET_RESPONSE);
        Ok(packet)
    }

    pub fn packet(&self) -> Option<&Packet> {
        self.packet.as_ref()
    }

    pub fn into_packet(self) -> Result<Packet> {
        match self.packet {
            Some(packet) => Ok(packet),
            None => self.build(),
        }
    }
}
