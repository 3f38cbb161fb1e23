//! The A-record store

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;
use veilnet_core::ARecord;

/// Per-domain record bound.
pub const MAX_RECORDS_PER_DOMAIN: usize = 2;

/// What happened to a record offered to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    DuplicateSuppressed,
    SlotFull,
}

/// In-memory multimap `domain -> records`, readers shared, writer
/// exclusive. Lookups return copies; internal references never leak.
#[derive(Default)]
pub struct DnsStore {
    records: RwLock<HashMap<String, Vec<ARecord>>>,
}

impl DnsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record unless its slot is full or it is byte-equal to an
    /// existing record (pass `allow_duplicates` to skip that check).
    pub fn save_record(&self, record: &ARecord, allow_duplicates: bool) -> SaveOutcome {
        let mut records = self.records.write();
        let slot = records.entry(record.domain.clone()).or_default();

        if !allow_duplicates && slot.iter().any(|existing| existing == record) {
            debug!(domain = %record.domain, "duplicate record suppressed");
            return SaveOutcome::DuplicateSuppressed;
        }
        if slot.len() >= MAX_RECORDS_PER_DOMAIN {
            return SaveOutcome::SlotFull;
        }

        slot.push(record.clone());
        SaveOutcome::Saved
    }

    /// Copy of the records for a domain, in insertion order.
    pub fn get_records_by_domain(&self, domain: &str) -> Vec<ARecord> {
        self.records
            .read()
            .get(domain)
            .cloned()
            .unwrap_or_default()
    }

    pub fn domain_count(&self) -> usize {
        self.records.read().len()
    }

    pub fn record_count(&self) -> usize {
        self.records.read().values().map(Vec::len).sum()
    }
}
