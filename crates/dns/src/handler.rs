//! The DNS packet hook

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use veilnet_core::{DnsRecordKind, Result, TypedPacket};
use veilnet_ssu::{HandlerContext, PacketHandler};

use crate::store::{DnsStore, SaveOutcome};

/// Saves inbound A-records into the overlay store.
pub struct DnsHandler {
    store: Arc<DnsStore>,
}

impl DnsHandler {
    pub fn new(store: Arc<DnsStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PacketHandler for DnsHandler {
    async fn handle(&self, packet: TypedPacket, ctx: HandlerContext) -> Result<()> {
        let TypedPacket::Dns(dns) = packet else {
            debug!("DNS hook ignoring non-DNS packet");
            return Ok(());
        };

        match dns.record {
            DnsRecordKind::A(record) => {
                record.validate()?;
                match self.store.save_record(&record, false) {
                    SaveOutcome::Saved => {
                        info!(
                            domain = %record.domain,
                            ip = record.ip_address.as_deref().unwrap_or("-"),
                            peer = %ctx.peer,
                            "DNS record saved"
                        );
                    }
                    SaveOutcome::DuplicateSuppressed => {
                        debug!(domain = %record.domain, "duplicate DNS record ignored");
                    }
                    SaveOutcome::SlotFull => {
                        warn!(
                            domain = %record.domain,
                            "domain slot full, record not saved"
                        );
                    }
                }
            }
            DnsRecordKind::Other(generic) => {
                warn!(
                    record_type = %generic.record_type,
                    peer = %ctx.peer,
                    "unsupported DNS record type, ignoring"
                );
            }
        }
        Ok(())
    }
}
