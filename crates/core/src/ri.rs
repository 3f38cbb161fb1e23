//! Routing-info records
//!
//! NRI describes a node, RRI describes a relay (and carries its RSA public
//! key for onion layering). Both are validated value objects persisted as
//! compressed blobs by the store crate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VeilNetError};

/// Schema version stamped on persisted records.
pub const RI_VERSION: &str = "1.0";

/// Role a node advertises in its NRI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    #[default]
    Standard,
    Relay,
    Gateway,
    Bridge,
}

impl std::str::FromStr for NodeType {
    type Err = VeilNetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "standard" => Ok(NodeType::Standard),
            "relay" => Ok(NodeType::Relay),
            "gateway" => Ok(NodeType::Gateway),
            "bridge" => Ok(NodeType::Bridge),
            other => Err(VeilNetError::Validation(format!(
                "node type must be one of: standard, relay, gateway, bridge, got {other}"
            ))),
        }
    }
}

fn validate_id(kind: &str, id: &str) -> Result<()> {
    if id.len() < 3 {
        return Err(VeilNetError::Validation(format!(
            "{kind} must be at least 3 characters long"
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(VeilNetError::Validation(format!(
            "{kind} can only contain alphanumeric characters, underscores, and hyphens"
        )));
    }
    Ok(())
}

fn validate_ipv4(ip: &str) -> Result<()> {
    ip.parse::<std::net::Ipv4Addr>()
        .map(|_| ())
        .map_err(|_| VeilNetError::Validation(format!("invalid IP address format: {ip}")))
}

fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(VeilNetError::Validation(
            "port must be between 1 and 65535".to_string(),
        ));
    }
    Ok(())
}

/// Node Routing Information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: String,
    pub node_ip: String,
    pub node_port: u16,
    #[serde(default)]
    pub node_type: NodeType,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: Option<String>,
}

impl NodeRecord {
    pub fn new(node_id: impl Into<String>, node_ip: impl Into<String>, node_port: u16) -> Self {
        Self {
            node_id: node_id.into(),
            node_ip: node_ip.into(),
            node_port,
            node_type: NodeType::default(),
            capabilities: Vec::new(),
            metadata: BTreeMap::new(),
            created_at: None,
            last_updated: None,
            version: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_id("node_id", &self.node_id)?;
        validate_ipv4(&self.node_ip)?;
        validate_port(self.node_port)?;
        Ok(())
    }

    /// Stamp persistence metadata; `created_at` is only set once.
    pub fn touch(&mut self) {
        let now = Utc::now();
        if self.created_at.is_none() {
            self.created_at = Some(now);
        }
        self.last_updated = Some(now);
        self.version = Some(RI_VERSION.to_string());
    }

    pub fn addr_string(&self) -> String {
        format!("{}:{}", self.node_ip, self.node_port)
    }
}

/// Relay Routing Information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayRecord {
    pub relay_id: String,
    pub relay_ip: String,
    pub relay_port: u16,
    /// RSA public key, PKCS#1 PEM.
    pub public_key: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: Option<String>,
}

impl RelayRecord {
    pub fn new(
        relay_id: impl Into<String>,
        relay_ip: impl Into<String>,
        relay_port: u16,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            relay_id: relay_id.into(),
            relay_ip: relay_ip.into(),
            relay_port,
            public_key: public_key.into(),
            metadata: BTreeMap::new(),
            created_at: None,
            last_updated: None,
            version: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_id("relay_id", &self.relay_id)?;
        validate_ipv4(&self.relay_ip)?;
        validate_port(self.relay_port)?;
        // Structural check only; the crypto layer rejects keys that fail to
        // parse when the chain is built.
        if !self.public_key.contains("BEGIN RSA PUBLIC KEY")
            && !self.public_key.contains("BEGIN PUBLIC KEY")
        {
            return Err(VeilNetError::Validation(
                "public_key is not a PEM-encoded RSA key".to_string(),
            ));
        }
        Ok(())
    }

    /// Stamp persistence metadata; `created_at` is only set once.
    pub fn touch(&mut self) {
        let now = Utc::now();
        if self.created_at.is_none() {
            self.created_at = Some(now);
        }
        self.last_updated = Some(now);
        self.version = Some(RI_VERSION.to_string());
    }

    pub fn addr_string(&self) -> String {
        format!("{}:{}", self.relay_ip, self.relay_port)
    }
}
