//! The delivery ledger: dedup admission, attempt log, status.
//!
//! Every status transition in the engine goes through the ledger. Admission
//! claims a dedup slot atomically, workers append attempts and conclude
//! requests, shutdown exhausts whatever is still pending. Records are kept
//! after their dedup window expires; only admission slots are pruned.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;

use herald_common::{
    AttemptOutcome, Channel, DeliveryAttempt, DeliveryStatus, EventKey, Priority, Recipient,
    RequestId,
};

use crate::types::{DedupKey, DeliveryRequest};

/// Outcome of a dedup admission check.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// The request owns its window slot and will be delivered.
    Admitted,
    /// An identical request already holds the slot for this window.
    Duplicate {
        existing: RequestId,
        status: DeliveryStatus,
    },
}

/// Everything the ledger remembers about one admitted request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestRecord {
    pub request_id: RequestId,
    pub event_key: EventKey,
    pub recipient: Recipient,
    pub channel: Channel,
    pub priority: Priority,
    pub status: DeliveryStatus,
    pub attempts: Vec<DeliveryAttempt>,
    pub admitted_at: SystemTime,
}

/// Counts per status across every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub pending: usize,
    pub sent: usize,
    pub failed: usize,
    pub exhausted: usize,
    pub total: usize,
}

/// The single writer of delivery state.
///
/// Cloning is cheap and shares the underlying maps, so the facade, the
/// dispatcher, and every worker operate on the same ledger.
#[derive(Debug, Clone, Default)]
pub struct DeliveryLedger {
    /// Current slot holder per dedup key.
    admissions: Arc<DashMap<DedupKey, RequestId>>,
    /// Audit record per admitted request, never pruned.
    records: Arc<DashMap<RequestId, RequestRecord>>,
}

impl DeliveryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim the request's dedup slot.
    ///
    /// Of any set of concurrent callers with the same key, exactly one is
    /// admitted and the rest observe `Duplicate`. A slot whose holder
    /// already failed terminally is released: the new request replaces the
    /// holder and is admitted, keeping the old record for audit.
    pub fn admit(&self, request: &DeliveryRequest) -> Admission {
        match self.admissions.entry(request.dedup_key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(request.id);
                self.insert_record(request);
                Admission::Admitted
            }
            Entry::Occupied(mut slot) => {
                let existing = *slot.get();
                let status = self
                    .records
                    .get(&existing)
                    .map_or(DeliveryStatus::Pending, |record| record.status.clone());

                if status.is_terminal_failure() {
                    slot.insert(request.id);
                    self.insert_record(request);
                    Admission::Admitted
                } else {
                    Admission::Duplicate { existing, status }
                }
            }
        }
    }

    fn insert_record(&self, request: &DeliveryRequest) {
        self.records.insert(
            request.id,
            RequestRecord {
                request_id: request.id,
                event_key: request.event_key.clone(),
                recipient: request.recipient.clone(),
                channel: request.channel,
                priority: request.priority,
                status: DeliveryStatus::Pending,
                attempts: Vec::new(),
                admitted_at: request.admitted_at,
            },
        );
    }

    /// Append an attempt to the request's audit trail and derive its new
    /// status.
    ///
    /// Attempt numbers are assigned here, strictly sequential from 1.
    /// Success concludes as `Sent`, a permanent failure as `Failed`; a
    /// transient failure leaves the request `Pending` for the worker to
    /// retry or exhaust. Attempts against a terminal record are ignored.
    pub fn record_attempt(
        &self,
        request_id: &RequestId,
        outcome: AttemptOutcome,
        detail: Option<String>,
    ) -> Option<DeliveryStatus> {
        let Some(mut record) = self.records.get_mut(request_id) else {
            tracing::warn!(request_id = %request_id, "attempt for unknown request ignored");
            return None;
        };
        let record = record.value_mut();

        if record.status.is_terminal() {
            tracing::warn!(
                request_id = %request_id,
                status = %record.status,
                "attempt after terminal status ignored"
            );
            return Some(record.status.clone());
        }

        let status = match outcome {
            AttemptOutcome::Success => DeliveryStatus::Sent,
            AttemptOutcome::TransientFailure => DeliveryStatus::Pending,
            AttemptOutcome::PermanentFailure => DeliveryStatus::Failed(
                detail
                    .clone()
                    .unwrap_or_else(|| "permanent delivery failure".to_owned()),
            ),
        };

        let attempt_number = u32::try_from(record.attempts.len()).unwrap_or(u32::MAX);
        record.attempts.push(DeliveryAttempt::now(
            attempt_number.saturating_add(1),
            outcome,
            detail,
        ));
        record.status = status.clone();

        Some(status)
    }

    /// Conclude a request whose retry budget ran out or that shutdown
    /// abandoned. No-op on already-terminal records.
    pub fn mark_exhausted(&self, request_id: &RequestId) -> Option<DeliveryStatus> {
        let mut record = self.records.get_mut(request_id)?;
        let record = record.value_mut();

        if !record.status.is_terminal() {
            record.status = DeliveryStatus::Exhausted;
        }

        Some(record.status.clone())
    }

    /// Exhaust every record still pending.
    ///
    /// Only valid once the queue is closed and drained: anything pending at
    /// that point can no longer be delivered.
    pub fn exhaust_pending(&self) -> usize {
        let mut exhausted = 0;
        for mut record in self.records.iter_mut() {
            if !record.status.is_terminal() {
                record.status = DeliveryStatus::Exhausted;
                exhausted += 1;
            }
        }
        exhausted
    }

    /// Drop admission slots from windows older than the current one.
    ///
    /// Records are untouched; the audit trail outlives the dedup window.
    pub fn prune_expired(&self, window_secs: u64, now: SystemTime) {
        let current_bucket = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            / window_secs.max(1);

        let before = self.admissions.len();
        self.admissions
            .retain(|key, _| key.window_bucket >= current_bucket);

        let pruned = before.saturating_sub(self.admissions.len());
        if pruned > 0 {
            tracing::debug!(pruned, "expired dedup admissions dropped");
        }
    }

    #[must_use]
    pub fn status_of(&self, request_id: &RequestId) -> Option<DeliveryStatus> {
        self.records
            .get(request_id)
            .map(|record| record.status.clone())
    }

    #[must_use]
    pub fn attempts_of(&self, request_id: &RequestId) -> Option<Vec<DeliveryAttempt>> {
        self.records
            .get(request_id)
            .map(|record| record.attempts.clone())
    }

    /// Full audit record for a request.
    #[must_use]
    pub fn record_of(&self, request_id: &RequestId) -> Option<RequestRecord> {
        self.records.get(request_id).map(|record| record.clone())
    }

    #[must_use]
    pub fn stats(&self) -> LedgerStats {
        let mut stats = LedgerStats::default();
        for record in self.records.iter() {
            stats.total += 1;
            match record.status {
                DeliveryStatus::Pending => stats.pending += 1,
                DeliveryStatus::Sent => stats.sent += 1,
                DeliveryStatus::Failed(_) => stats.failed += 1,
                DeliveryStatus::Exhausted => stats.exhausted += 1,
            }
        }
        stats
    }

    /// Dedup slots currently held.
    #[must_use]
    pub fn active_admissions(&self) -> usize {
        self.admissions.len()
    }
}
