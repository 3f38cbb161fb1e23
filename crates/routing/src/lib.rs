//! VeilNet routing
//!
//! Builds the onion chain for outbound requests: pick a shuffled subset of
//! known relays into a routing map, then wrap the request payload in one
//! encrypted layer per hop, inside-out, so only hop `i` can reveal the
//! descriptor addressed to hop `i + 1`.

mod chain;
mod map;
mod request;

pub use chain::{
    build_routing_chain, ChainStrategy, CHAIN_BATCH_SIZE, DEFAULT_CHAIN_STRATEGY,
};
pub use map::{generate_relay_map, DEFAULT_MAX_MAP_SIZE, RI_LIST_EXTRA};
pub use request::{request_factory, Request};
