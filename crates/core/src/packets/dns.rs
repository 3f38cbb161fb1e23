//! DNS-typed SSU packets

use serde::Deserialize;

use crate::dns_record::{ARecord, GenericRecord};
use crate::error::{Result, VeilNetError};
use crate::packet::{header, Packet};

/// The record carried by a DNS packet, branched on `record_type`.
#[derive(Debug, Clone, PartialEq)]
pub enum DnsRecordKind {
    A(ARecord),
    Other(GenericRecord),
}

/// A `DNS`-headered packet whose body is a JSON record.
#[derive(Debug, Clone)]
pub struct DnsPacket {
    packet: Packet,
    pub record: DnsRecordKind,
}

#[derive(Deserialize)]
struct RecordTypeProbe {
    #[serde(default)]
    record_type: String,
}

impl DnsPacket {
    pub fn from_packet(packet: Packet) -> Result<Self> {
        if !packet.has_header(header::DNS) {
            return Err(VeilNetError::Validation(format!(
                "not a DNS packet: {:?}",
                packet.header()
            )));
        }
        let body = packet.body();
        let probe: RecordTypeProbe = serde_json::from_str(body)?;
        let record = match probe.record_type.as_str() {
            "A" => DnsRecordKind::A(serde_json::from_str(body)?),
            _ => DnsRecordKind::Other(serde_json::from_str(body)?),
        };
        Ok(Self { packet, record })
    }

    /// Build a DNS packet carrying an A-record.
    pub fn from_record(record: &ARecord) -> Result<Packet> {
        let json = serde_json::to_string(record)?;
        let mut packet = Packet::from_text(json);
        packet.assemble_header(header::DNS);
        Ok(packet)
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn into_packet(self) -> Packet {
        self.packet
    }
}
