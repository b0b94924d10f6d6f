use parking_lot::Mutex;
use tracing::info;

use crate::domain::{AuditEvent, AuditSink};

/// Writes audit events to the log.
#[derive(Default, Debug)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        info!(
            target: "audit",
            account_id = %event.account_id,
            action = ?event.action,
            old = %event.old_value,
            new = %event.new_value,
            at = %event.at,
            "ledger change"
        );
    }
}

/// Keeps audit events in memory, for callers that forward them in batches.
#[derive(Default, Debug)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<AuditEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}
