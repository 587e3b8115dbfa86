//! The delivery status state machine and per-attempt audit records.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Classified result of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The channel adapter accepted the message.
    Success,
    /// The adapter failed in a way a retry may fix (timeout, throttling,
    /// provider hiccup).
    TransientFailure,
    /// The adapter failed in a way retries cannot fix (invalid recipient,
    /// rejected payload), or the template could not render.
    PermanentFailure,
}

impl AttemptOutcome {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::TransientFailure => "transient_failure",
            Self::PermanentFailure => "permanent_failure",
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One delivery attempt, as kept in the ledger's audit trail.
///
/// Attempts are append-only. Numbers start at 1 and are strictly sequential
/// per request; a recorded attempt is never mutated or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    /// 1-based attempt number.
    pub attempt_number: u32,
    /// When the attempt concluded.
    pub timestamp: SystemTime,
    /// Classified outcome.
    pub outcome: AttemptOutcome,
    /// Adapter or renderer detail, present for failures.
    pub detail: Option<String>,
}

impl DeliveryAttempt {
    /// An attempt concluding now.
    #[must_use]
    pub fn now(attempt_number: u32, outcome: AttemptOutcome, detail: Option<String>) -> Self {
        Self {
            attempt_number,
            timestamp: SystemTime::now(),
            outcome,
            detail,
        }
    }
}

/// Current state of a delivery request.
///
/// ```text
/// Pending ──► Sent
///    ├──────► Failed(reason)
///    └──────► Exhausted
/// ```
///
/// `Sent`, `Failed` and `Exhausted` are terminal: a terminal status never
/// transitions again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Admitted; delivery has not concluded yet (queued, in flight, or
    /// waiting out a backoff delay).
    Pending,
    /// Handed to the channel adapter successfully.
    Sent,
    /// Permanent failure; the reason comes from the final attempt.
    Failed(String),
    /// The retry budget ran out on transient failures, or the request was
    /// drained during shutdown.
    Exhausted,
}

impl DeliveryStatus {
    /// Whether this status can never transition again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether this status is a terminal failure (`Failed` or `Exhausted`).
    ///
    /// A terminal failure releases its dedup slot, so an identical request
    /// may be re-admitted within the same window.
    #[must_use]
    pub const fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Exhausted)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Sent => f.write_str("sent"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Exhausted => f.write_str("exhausted"),
        }
    }
}
