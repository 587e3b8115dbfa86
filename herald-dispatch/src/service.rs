//! Read-only query surface over the ledger.

use herald_common::{DeliveryAttempt, DeliveryStatus, RequestId};

use crate::ledger::{DeliveryLedger, LedgerStats};

/// Read-only view of delivery state.
///
/// Operational tooling holds this instead of the full
/// [`DeliveryLedger`] so it can observe deliveries without being able to
/// mutate them.
pub trait DeliveryQueryService: Send + Sync {
    /// Current status, or `None` for an unknown request id.
    fn status_of(&self, request_id: &RequestId) -> Option<DeliveryStatus>;

    /// Append-only attempt log, or `None` for an unknown request id.
    fn attempts_of(&self, request_id: &RequestId) -> Option<Vec<DeliveryAttempt>>;

    /// Counts per status across every record.
    fn stats(&self) -> LedgerStats;
}

impl DeliveryQueryService for DeliveryLedger {
    fn status_of(&self, request_id: &RequestId) -> Option<DeliveryStatus> {
        self.status_of(request_id)
    }

    fn attempts_of(&self, request_id: &RequestId) -> Option<Vec<DeliveryAttempt>> {
        self.attempts_of(request_id)
    }

    fn stats(&self) -> LedgerStats {
        self.stats()
    }
}
