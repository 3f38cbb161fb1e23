//! VeilNet DNS overlay
//!
//! A capacity-limited in-memory A-record store fed by `DNS`-typed SSU
//! packets. Each domain slot holds at most two records; byte-equal
//! duplicates are suppressed, and a full slot leaves the store untouched.
//! The bound is deliberate flood resistance, not a cache policy.

mod handler;
mod store;

pub use handler::DnsHandler;
pub use store::{DnsStore, SaveOutcome, MAX_RECORDS_PER_DOMAIN};
