//! Typed failures for admission and delivery.
//!
//! Admission errors surface synchronously to producers before anything is
//! enqueued. Adapter errors are per-attempt and classified by the adapter
//! itself: transient failures are retried with backoff, permanent ones
//! conclude the request immediately.

use herald_common::ChannelSet;
use thiserror::Error;

/// A channel override that is not covered by the event's allowed channels.
///
/// Overrides are validated against the event definition before any channel
/// is admitted, so a rejected override admits nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid channel override [{requested}], event allows [{allowed}]")]
pub struct InvalidChannelError {
    pub requested: ChannelSet,
    pub allowed: ChannelSet,
}

/// The delivery pipeline is at capacity; nothing was admitted or enqueued.
///
/// Capacity counts every admitted request that has not yet reached a
/// terminal status, not just the ones waiting for a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("delivery queue saturated at {capacity} requests, retry later")]
pub struct QueueSaturatedError {
    pub capacity: usize,
}

/// The dispatcher has stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("delivery queue is closed")]
pub struct QueueClosedError;

/// Failure reported by a channel adapter for a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// A retry may succeed: timeouts, throttling, provider hiccups.
    #[error("transient channel failure: {detail}")]
    Transient { detail: String },

    /// Retries cannot help: invalid recipient, rejected payload.
    #[error("permanent channel failure: {detail}")]
    Permanent { detail: String },
}

impl AdapterError {
    pub fn transient(detail: impl Into<String>) -> Self {
        Self::Transient {
            detail: detail.into(),
        }
    }

    pub fn permanent(detail: impl Into<String>) -> Self {
        Self::Permanent {
            detail: detail.into(),
        }
    }

    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent { .. })
    }

    /// The adapter-provided failure detail.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Transient { detail } | Self::Permanent { detail } => detail,
        }
    }
}
