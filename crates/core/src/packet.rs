//! The base SSU datagram unit
//!
//! A packet is an address plus a UTF-8 text body whose first
//! whitespace-delimited token is the header. Raw bytes and the string form
//! are kept mirrored; the raw form is what goes on the wire.
//!
//! Request/response correlation rides as an optional tag token directly
//! after the header: `@<uuid>` marks a request, `#<uuid>` marks the reply
//! that answers it. The transport strips the tag before a handler sees the
//! body.

use std::net::SocketAddr;

use uuid::Uuid;

use crate::error::{Result, VeilNetError};

/// Registered header literals. The first token of every packet's string
/// form must be one of these for typed dispatch; anything else stays a
/// plain packet.
pub mod header {
    pub const SSU: &str = "SSU";
    pub const SSU_CONTROL: &str = "SSU_CONTROL";
    pub const SSU_FRAGMENT: &str = "SSU_FRAGMENT";
    pub const DNS: &str = "DNS";
    pub const INTERNAL_HTTP_PACKET: &str = "INTERNAL_HTTP_PACKET";
    pub const INTERNAL_HTTP_PACKET_RESPONSE: &str = "INTERNAL_HTTP_PACKET_RESPONSE";
    pub const PROPAGATION_PACKET: &str = "PROPAGATION_PACKET";

    pub const ALL: &[&str] = &[
        SSU,
        SSU_CONTROL,
        SSU_FRAGMENT,
        DNS,
        INTERNAL_HTTP_PACKET,
        INTERNAL_HTTP_PACKET_RESPONSE,
        PROPAGATION_PACKET,
    ];

    pub fn is_registered(token: &str) -> bool {
        ALL.contains(&token)
    }
}

/// Port assumed when an address string carries none.
pub const DEFAULT_PORT: u16 = 9000;

/// Parse an `ip:port` or bare `ip` string into a socket address.
pub fn parse_addr(s: &str) -> Result<SocketAddr> {
    let candidate = if s.contains(':') {
        s.to_string()
    } else {
        format!("{s}:{DEFAULT_PORT}")
    };
    candidate
        .parse()
        .map_err(|_| VeilNetError::Validation(format!("invalid address: {s}")))
}

/// Which side of a request/response pair a correlation tag marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Request,
    Response,
}

impl TagKind {
    fn sigil(self) -> char {
        match self {
            TagKind::Request => '@',
            TagKind::Response => '#',
        }
    }

    fn from_sigil(c: char) -> Option<Self> {
        match c {
            '@' => Some(TagKind::Request),
            '#' => Some(TagKind::Response),
            _ => None,
        }
    }
}

/// Unencrypted datagram: destination (or origin) address plus the mirrored
/// raw/string payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub addr: Option<SocketAddr>,
    raw: Vec<u8>,
    text: String,
}

impl Packet {
    /// Build a packet from its string form.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let raw = text.as_bytes().to_vec();
        Self {
            addr: None,
            raw,
            text,
        }
    }

    /// Build a packet from wire bytes, as received from the socket.
    pub fn from_raw(raw: Vec<u8>) -> Self {
        let text = String::from_utf8_lossy(&raw).into_owned();
        Self {
            addr: None,
            raw,
            text,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Replace the payload, keeping raw and string forms mirrored.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.raw = self.text.as_bytes().to_vec();
    }

    /// First whitespace-delimited token, if any.
    pub fn header(&self) -> Option<&str> {
        self.text.split_whitespace().next()
    }

    pub fn has_header(&self, header: &str) -> bool {
        self.header() == Some(header)
    }

    /// Prefix the header token unless already present.
    pub fn assemble_header(&mut self, header: &str) {
        if !self.has_header(header) {
            let text = if self.text.is_empty() {
                header.to_string()
            } else {
                format!("{header} {}", self.text)
            };
            self.set_text(text);
        }
    }

    /// Drop the header token, leaving only the body.
    pub fn remove_header(&mut self) {
        let rest = match self.text.split_once(' ') {
            Some((_, rest)) => rest.to_string(),
            None => String::new(),
        };
        self.set_text(rest);
    }

    /// Everything after the header token.
    pub fn body(&self) -> &str {
        self.text
            .split_once(' ')
            .map(|(_, rest)| rest)
            .unwrap_or("")
    }

    /// Parse the correlation tag token, if present after the header.
    pub fn tag(&self) -> Option<(TagKind, Uuid)> {
        let mut parts = self.text.splitn(3, ' ');
        let _header = parts.next()?;
        let token = parts.next()?;
        let kind = TagKind::from_sigil(token.chars().next()?)?;
        Uuid::parse_str(&token[1..]).ok().map(|id| (kind, id))
    }

    /// Insert (or replace) the correlation tag after the header token.
    pub fn set_tag(&mut self, kind: TagKind, id: Uuid) {
        let _ = self.strip_tag();
        let text = match self.text.split_once(' ') {
            Some((header, rest)) => format!("{header} {}{id} {rest}", kind.sigil()),
            None => format!("{} {}{id}", self.text, kind.sigil()),
        };
        self.set_text(text);
    }

    /// Remove the correlation tag, returning it if one was present.
    pub fn strip_tag(&mut self) -> Option<(TagKind, Uuid)> {
        let tag = self.tag()?;
        let mut parts = self.text.splitn(3, ' ');
        let header = parts.next().unwrap_or("").to_string();
        let _token = parts.next();
        let rest = parts.next().unwrap_or("").to_string();
        if rest.is_empty() {
            self.set_text(header);
        } else {
            self.set_text(format!("{header} {rest}"));
        }
        Some(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_and_text_mirror() {
        let mut packet = Packet::from_text("SSU hello");
        assert_eq!(packet.raw(), b"SSU hello");

        packet.set_text("SSU goodbye");
        assert_eq!(packet.raw(), b"SSU goodbye");
        assert_eq!(packet.text(), "SSU goodbye");
    }

    #[test]
    fn test_from_raw() {
        let packet = Packet::from_raw(b"DNS {\"domain\":\"a\"}".to_vec());
        assert_eq!(packet.header(), Some("DNS"));
        assert_eq!(packet.body(), "{\"domain\":\"a\"}");
    }

    #[test]
    fn test_assemble_header_is_idempotent() {
        let mut packet = Packet::from_text("payload");
        packet.assemble_header(header::SSU);
        packet.assemble_header(header::SSU);
        assert_eq!(packet.text(), "SSU payload");
    }

    #[test]
    fn test_assemble_header_on_empty_body() {
        let mut packet = Packet::from_text("");
        packet.assemble_header(header::SSU);
        assert_eq!(packet.text(), "SSU");
    }

    #[test]
    fn test_remove_header() {
        let mut packet = Packet::from_text("SSU_CONTROL STATUS");
        packet.remove_header();
        assert_eq!(packet.text(), "STATUS");

        let mut bare = Packet::from_text("SSU");
        bare.remove_header();
        assert_eq!(bare.text(), "");
    }

    #[test]
    fn test_header_registry() {
        assert!(header::is_registered("SSU_FRAGMENT"));
        assert!(!header::is_registered("BOGUS"));
        assert_eq!(header::ALL.len(), 7);
    }

    #[test]
    fn test_parse_addr_with_port() {
        let addr = parse_addr("10.0.0.1:9999").unwrap();
        assert_eq!(addr.port(), 9999);
    }

    #[test]
    fn test_parse_addr_default_port() {
        let addr = parse_addr("10.0.0.1").unwrap();
        assert_eq!(addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_parse_addr_invalid() {
        assert!(parse_addr("not-an-address").is_err());
    }

    #[test]
    fn test_request_tag_roundtrip() {
        let id = Uuid::new_v4();
        let mut packet = Packet::from_text("SSU payload data");
        packet.set_tag(TagKind::Request, id);

        assert_eq!(packet.text(), format!("SSU @{id} payload data"));
        assert_eq!(packet.tag(), Some((TagKind::Request, id)));

        let stripped = packet.strip_tag();
        assert_eq!(stripped, Some((TagKind::Request, id)));
        assert_eq!(packet.text(), "SSU payload data");
    }

    #[test]
    fn test_response_tag() {
        let id = Uuid::new_v4();
        let mut packet = Packet::from_text("SSU pong");
        packet.set_tag(TagKind::Response, id);
        assert_eq!(packet.tag(), Some((TagKind::Response, id)));
    }

    #[test]
    fn test_set_tag_replaces_existing() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let mut packet = Packet::from_text("SSU data");
        packet.set_tag(TagKind::Request, first);
        packet.set_tag(TagKind::Request, second);
        assert_eq!(packet.tag(), Some((TagKind::Request, second)));
        assert_eq!(packet.body().matches('@').count(), 1);
    }

    #[test]
    fn test_non_tag_token_is_not_a_tag() {
        let packet = Packet::from_text("SSU payload");
        assert_eq!(packet.tag(), None);

        let at_but_not_uuid = Packet::from_text("SSU @nope rest");
        assert_eq!(at_but_not_uuid.tag(), None);
    }
}
