//! VeilNet relay
//!
//! The per-hop unwrap rule: RSA-unwrap the layer's session key, open the
//! Fernet token, verify the plaintext digest, then either forward the
//! revealed descriptor to the next hop or, at the exit, replay the inner
//! request against its target and stream the response back along the
//! reverse chain.

mod exit;
mod handler;
mod unwrap;

pub use exit::{parse_exit_payload, ExitClient, ExitRequest};
pub use handler::RelayHandler;
pub use unwrap::{unwrap_layer, UnwrappedLayer};
