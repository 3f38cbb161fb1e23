//! VeilNet record store
//!
//! Filesystem persistence for routing-info records and key material:
//!
//! - `<data-dir>/nri/<node_id>.bin`: zlib-compressed JSON of an NRI
//! - `<data-dir>/rri/<relay_id>.bin`: same for RRIs
//! - `<data-dir>/local/nri.bin`: this node's own record
//! - `<data-dir>/local/<name>.key`: PEM or base64 key text
//!
//! Creating an id that already exists is a conflict; loading or deleting
//! a missing one is not-found.

mod blob;
mod records;

pub use records::{RecordStore, LOCAL_NODE_FILE};

use thiserror::Error;
use veilnet_core::VeilNetError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid record id: {0}")]
    InvalidId(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<StoreError> for VeilNetError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(id) => VeilNetError::Conflict(id),
            StoreError::NotFound(id) => VeilNetError::NotFound(id),
            StoreError::InvalidId(id) => VeilNetError::Validation(format!("invalid id: {id}")),
            StoreError::Validation(msg) => VeilNetError::Validation(msg),
            StoreError::Serialization(e) => VeilNetError::Serialization(e.to_string()),
            StoreError::Io(e) => VeilNetError::Transport(format!("store IO: {e}")),
        }
    }
}

impl From<VeilNetError> for StoreError {
    fn from(err: VeilNetError) -> Self {
        StoreError::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
