//! Core delivery types.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use herald_common::{Channel, EventKey, Priority, Recipient, RequestId, Variables};

/// Identity of a notification for duplicate suppression.
///
/// Two requests are duplicates when every component matches, including the
/// fingerprint of the full variable map and the dedup window bucket they
/// were admitted in. A new bucket opens a fresh window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey {
    pub event_key: EventKey,
    pub recipient: Recipient,
    pub channel: Channel,
    pub variables_fingerprint: u64,
    pub window_bucket: u64,
}

impl DedupKey {
    /// Derive the key for a request admitted at `now` under a window of
    /// `window_secs` seconds.
    #[must_use]
    pub fn derive(
        event_key: &EventKey,
        recipient: &Recipient,
        channel: Channel,
        variables: &Variables,
        window_secs: u64,
        now: SystemTime,
    ) -> Self {
        let unix_secs = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Self {
            event_key: event_key.clone(),
            recipient: recipient.clone(),
            channel,
            variables_fingerprint: variables.fingerprint(),
            window_bucket: unix_secs / window_secs.max(1),
        }
    }
}

/// One admitted notification bound to a single channel.
///
/// A request is created per effective channel at admission and owned by one
/// worker for its whole delivery lifetime.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    pub id: RequestId,
    pub event_key: EventKey,
    pub recipient: Recipient,
    pub channel: Channel,
    pub variables: Variables,
    pub priority: Priority,
    pub dedup_key: DedupKey,
    pub admitted_at: SystemTime,
}

impl DeliveryRequest {
    /// Build a request admitted now, deriving its id and dedup key.
    #[must_use]
    pub fn new(
        event_key: EventKey,
        recipient: Recipient,
        channel: Channel,
        variables: Variables,
        priority: Priority,
        window_secs: u64,
    ) -> Self {
        let admitted_at = SystemTime::now();
        let dedup_key = DedupKey::derive(
            &event_key,
            &recipient,
            channel,
            &variables,
            window_secs,
            admitted_at,
        );

        Self {
            id: RequestId::generate(),
            event_key,
            recipient,
            channel,
            variables,
            priority,
            dedup_key,
            admitted_at,
        }
    }
}

/// Point-in-time queue gauges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Admitted requests the pipeline will hold at most.
    pub capacity: usize,
    /// Capacity still available to new admissions.
    pub available: usize,
    /// Requests waiting for a worker.
    pub buffered: usize,
    /// Requests currently owned by a worker.
    pub in_flight: usize,
}
