//! SSU control packets
//!
//! Body grammar: `COMMAND[ k=v(,k=v)*]`. Unknown commands parse fine and
//! are left to the handler to log and ignore.

use std::collections::BTreeMap;

use crate::error::{Result, VeilNetError};
use crate::packet::{header, Packet};

/// Known control commands. The set is open; these are the ones this node
/// acts on.
pub mod commands {
    pub const STATUS: &str = "STATUS";
    pub const PUNCH: &str = "PUNCH";
}

/// A parsed `SSU_CONTROL` packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPacket {
    packet: Packet,
    pub command: String,
    pub params: BTreeMap<String, String>,
}

impl ControlPacket {
    pub fn from_packet(packet: Packet) -> Result<Self> {
        if !packet.has_header(header::SSU_CONTROL) {
            return Err(VeilNetError::Validation(format!(
                "not an SSU_CONTROL packet: {:?}",
                packet.header()
            )));
        }
        let body = packet.body();
        let (command, params_str) = match body.split_once(' ') {
            Some((cmd, rest)) => (cmd.to_string(), rest),
            None => (body.to_string(), ""),
        };
        if command.is_empty() {
            return Err(VeilNetError::Validation(
                "control packet has no command".to_string(),
            ));
        }
        let mut params = BTreeMap::new();
        for pair in params_str.split(',') {
            if let Some((key, value)) = pair.split_once('=') {
                params.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Ok(Self {
            packet,
            command,
            params,
        })
    }

    /// Build a control packet from a command and parameter pairs.
    pub fn build(command: &str, params: &[(&str, &str)]) -> Packet {
        let mut body = command.to_string();
        if !params.is_empty() {
            let joined = params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",");
            body.push(' ');
            body.push_str(&joined);
        }
        let mut packet = Packet::from_text(body);
        packet.assemble_header(header::SSU_CONTROL);
        packet
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn into_packet(self) -> Packet {
        self.packet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_with_params() {
        let packet = Packet::from_text("SSU_CONTROL RESTART delay=5,force=true");
        let control = ControlPacket::from_packet(packet).unwrap();
        assert_eq!(control.command, "RESTART");
        assert_eq!(control.params.get("delay").map(String::as_str), Some("5"));
        assert_eq!(
            control.params.get("force").map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn test_parse_command_without_params() {
        let packet = Packet::from_text("SSU_CONTROL STATUS");
        let control = ControlPacket::from_packet(packet).unwrap();
        assert_eq!(control.command, commands::STATUS);
        assert!(control.params.is_empty());
    }

    #[test]
    fn test_parse_rejects_wrong_header() {
        let packet = Packet::from_text("SSU STATUS");
        assert!(ControlPacket::from_packet(packet).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_body() {
        let packet = Packet::from_text("SSU_CONTROL");
        assert!(ControlPacket::from_packet(packet).is_err());
    }

    #[test]
    fn test_build_roundtrip() {
        let packet = ControlPacket::build(commands::PUNCH, &[("port", "9999")]);
        assert_eq!(packet.text(), "SSU_CONTROL PUNCH port=9999");

        let control = ControlPacket::from_packet(packet).unwrap();
        assert_eq!(control.command, commands::PUNCH);
        assert_eq!(control.params.get("port").map(String::as_str), Some("9999"));
    }

    #[test]
    fn test_malformed_params_are_skipped() {
        let packet = Packet::from_text("SSU_CONTROL STATUS noequals,key=value");
        let control = ControlPacket::from_packet(packet).unwrap();
        assert_eq!(control.params.len(), 1);
        assert_eq!(control.params.get("key").map(String::as_str), Some("value"));
    }
}
