//! Request assembly and the request factory

use serde_json::Value;
use veilnet_core::{
    parse_addr, HttpContents, Packet, RelayRecord, RequestData, RequestProtocol, Result,
    RouteDescriptor, RoutingMap, SsuPacket, TcpContents, VeilNetError,
};

use crate::chain::{build_routing_chain, ChainStrategy};
use crate::map::generate_relay_map;

/// An outbound request bound to a routing map.
#[derive(Debug, Clone)]
pub struct Request {
    pub data: RequestData,
    pub protocol: RequestProtocol,
    pub target: String,
    pub routing_map: RoutingMap,
    pub chain: Option<RouteDescriptor>,
}

impl Request {
    pub fn new(data: RequestData, routing_map: RoutingMap) -> Self {
        let target = data.target.clone();
        Self {
            data,
            protocol: RequestProtocol::default(),
            target,
            routing_map,
            chain: None,
        }
    }

    /// Build (or rebuild) the encrypted chain over the routing map.
    pub async fn generate_routing_chain(
        &mut self,
        strategy: ChainStrategy,
    ) -> Result<&RouteDescriptor> {
        let payload = String::from_utf8(self.data.to_bytes())
            .map_err(|_| VeilNetError::Validation("request payload is not UTF-8".to_string()))?;
        let chain = build_routing_chain(&payload, &self.routing_map, strategy).await?;
        Ok(self.chain.insert(chain))
    }

    /// Wrap the outermost descriptor in an SSU packet addressed to the
    /// first hop.
    pub fn to_ssu_packet(&self) -> Result<Packet> {
        let chain = self
            .chain
            .as_ref()
            .ok_or_else(|| VeilNetError::Validation("routing chain not generated".to_string()))?;
        let addr = parse_addr(&format!("{}:{}", chain.relay_ip, chain.relay_port))?;
        let packet = SsuPacket::from_body(chain.to_json()?).into_packet();
        Ok(packet.with_addr(addr))
    }
}

/// Build a validated request from loose inputs.
///
/// `payload_protocol` picks the contents family (`http`/`https` or
/// `tcp`/`udp`); `contents` carries its fields as JSON.
pub fn request_factory(
    target: &str,
    payload_protocol: &str,
    contents: Value,
    relays: &[RelayRecord],
    max_map_size: usize,
) -> Result<Request> {
    if target.is_empty() {
        return Err(VeilNetError::Validation("target must be set".to_string()));
    }

    let data = match payload_protocol {
        "http" | "https" => {
            let mut fields = match contents {
                Value::Null => serde_json::Map::new(),
                Value::Object(map) => map,
                other => {
                    return Err(VeilNetError::Validation(format!(
                        "contents must be a JSON object, got {other}"
                    )))
                }
            };
            fields
                .entry("method".to_string())
                .or_insert_with(|| Value::String("GET".to_string()));
            let http: HttpContents = serde_json::from_value(Value::Object(fields))?;
            http.validate()?;
            RequestData::http(target, http)
        }
        "tcp" | "udp" => {
            let tcp: TcpContents = match contents {
                Value::Null => TcpContents::default(),
                other => serde_json::from_value(other)?,
            };
            tcp.validate()?;
            RequestData::tcp(target, tcp)
        }
        other => {
            return Err(VeilNetError::Validation(format!(
                "unknown request protocol: {other}. Supported protocols are 'http' and 'tcp'"
            )))
        }
    };

    let routing_map = generate_relay_map(relays, max_map_size)?;
    Ok(Request::new(data, routing_map))
}
