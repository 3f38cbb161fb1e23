//! VeilNet SSU transport
//!
//! One UDP socket per node, acting as listener and sender for every packet
//! type. The node fragments oversized datagrams, reassembles inbound
//! fragments, correlates request/response pairs by tagged uuid, and
//! dispatches fully-reassembled packets to header-keyed hooks on a worker
//! pool. Handler failures are logged and never abort the receive loop.

mod config;
mod fragment;
mod handler;
mod node;
mod request;

pub use config::SsuConfig;
pub use fragment::{fragment_raw, Reassembler, FRAGMENT_TIMEOUT, MAX_UDP_PACKET_SIZE};
pub use handler::{HandlerContext, PacketHandler, SsuSender};
pub use node::{SsuNode, SsuStats, INBOUND_QUEUE_CAPACITY};
pub use request::{PendingTable, SsuRequest};

use thiserror::Error;
use veilnet_core::VeilNetError;

#[derive(Error, Debug)]
pub enum SsuError {
    #[error("Failed to bind UDP socket: {0}")]
    Bind(std::io::Error),

    #[error("Send failed: {0}")]
    Send(std::io::Error),

    #[error("Packet has no destination address")]
    NoAddress,

    #[error("Node is not running")]
    NotRunning,

    #[error("Timeout")]
    Timeout,

    #[error("Shutdown")]
    Shutdown,
}

impl From<SsuError> for VeilNetError {
    fn from(err: SsuError) -> Self {
        match err {
            SsuError::Timeout => VeilNetError::Timeout,
            SsuError::Shutdown => VeilNetError::Shutdown,
            other => VeilNetError::Transport(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SsuError>;
