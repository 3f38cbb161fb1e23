//! DNS overlay record schemas

use serde::{Deserialize, Serialize};

use crate::error::{Result, VeilNetError};

fn default_record_type() -> String {
    "A".to_string()
}

fn default_protocols() -> Vec<String> {
    vec!["ssu".to_string(), "i2p".to_string()]
}

fn default_ttl() -> Option<u32> {
    Some(3600)
}

/// An overlay A-record mapping a domain to an address or node id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ARecord {
    #[serde(default = "default_record_type")]
    pub record_type: String,
    pub domain: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default = "default_protocols")]
    pub allowed_protocols: Vec<String>,
    #[serde(default = "default_ttl")]
    pub ttl: Option<u32>,
}

impl ARecord {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            record_type: default_record_type(),
            domain: domain.into(),
            ip_address: None,
            node_id: None,
            allowed_protocols: default_protocols(),
            ttl: default_ttl(),
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.record_type != "A" {
            return Err(VeilNetError::Validation(format!(
                "record_type must be A, got {}",
                self.record_type
            )));
        }
        if self.domain.len() < 3 {
            return Err(VeilNetError::Validation(
                "domain must be at least 3 characters long".to_string(),
            ));
        }
        if let Some(ip) = &self.ip_address {
            if ip.parse::<std::net::Ipv4Addr>().is_err() {
                return Err(VeilNetError::Validation(format!(
                    "invalid IP address: {ip}"
                )));
            }
        }
        for protocol in &self.allowed_protocols {
            if protocol != "ssu" && protocol != "i2p" {
                return Err(VeilNetError::Validation(format!(
                    "invalid protocol: {protocol} (allowed: ssu, i2p)"
                )));
            }
        }
        Ok(())
    }
}

/// Fallback for record types this node does not understand. Kept parseable
/// so unknown records can be logged without being stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericRecord {
    #[serde(default)]
    pub record_type: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}
