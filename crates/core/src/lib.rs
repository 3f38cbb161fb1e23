//! VeilNet core types
//!
//! The shared vocabulary of the overlay: the SSU packet model and its
//! header-dispatched typed variants, routing-info records (NRI/RRI), DNS
//! overlay records, onion route descriptors, and the request model.
//!
//! Everything here is plain data plus validation; I/O lives in the
//! transport and store crates.

pub mod dispatch;
pub mod dns_record;
pub mod error;
pub mod packet;
pub mod packets;
pub mod request;
pub mod ri;
pub mod route;

pub use dispatch::{upgrade, TypedPacket};
pub use dns_record::{ARecord, GenericRecord};
pub use error::{Result, VeilNetError};
pub use packet::{header, parse_addr, Packet, TagKind, DEFAULT_PORT};
pub use packets::control::{commands, ControlPacket};
pub use packets::dns::{DnsPacket, DnsRecordKind};
pub use packets::fragment::FragmentPacket;
pub use packets::http::{InternalHttpPacket, InternalHttpResponsePacket};
pub use packets::propagation::{PropagationEnvelope, PropagationPacket, TargetRi};
pub use packets::ssu::SsuPacket;
pub use request::{
    HttpContents, PayloadProtocol, RequestContents, RequestData, RequestProtocol, TcpContents,
};
pub use ri::{NodeRecord, NodeType, RelayRecord, RI_VERSION};
pub use route::{HopAddress, RelayHop, RouteDescriptor, RoutingMap};
