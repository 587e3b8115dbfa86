//! Bounded intake for admitted delivery requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{QueueClosedError, QueueSaturatedError};
use crate::types::{DeliveryRequest, QueueStats};

/// A request travelling through the pipeline, carrying its capacity permit
/// and its FIFO sequence number.
#[derive(Debug)]
pub(crate) struct QueuedRequest {
    pub(crate) request: Arc<DeliveryRequest>,
    pub(crate) seq: u64,
    pub(crate) permit: OwnedSemaphorePermit,
}

#[derive(Debug, Default)]
pub(crate) struct QueueGauges {
    pub(crate) buffered: AtomicUsize,
    pub(crate) in_flight: AtomicUsize,
}

/// Producer handle to the bounded delivery queue.
///
/// Capacity covers the whole pipeline: a permit is claimed before a request
/// is admitted and released only when the request reaches a terminal
/// status, so waiting, buffered, and in-flight requests all count against
/// `capacity`.
#[derive(Debug, Clone)]
pub struct DeliveryQueue {
    tx: mpsc::Sender<QueuedRequest>,
    permits: Arc<Semaphore>,
    capacity: usize,
    seq: Arc<AtomicU64>,
    gauges: Arc<QueueGauges>,
}

impl DeliveryQueue {
    pub(crate) fn bounded(capacity: usize) -> (Self, mpsc::Receiver<QueuedRequest>) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);

        let queue = Self {
            tx,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            seq: Arc::new(AtomicU64::new(0)),
            gauges: Arc::new(QueueGauges::default()),
        };

        (queue, rx)
    }

    pub(crate) fn gauges(&self) -> Arc<QueueGauges> {
        Arc::clone(&self.gauges)
    }

    /// Claim capacity for `n` requests without waiting.
    ///
    /// All-or-nothing: on saturation every permit grabbed so far is dropped
    /// again and the caller gets [`QueueSaturatedError`] before any
    /// admission has happened.
    pub fn try_reserve(
        &self,
        n: usize,
    ) -> Result<Vec<OwnedSemaphorePermit>, QueueSaturatedError> {
        let mut permits = Vec::with_capacity(n);
        for _ in 0..n {
            match Arc::clone(&self.permits).try_acquire_owned() {
                Ok(permit) => permits.push(permit),
                Err(_) => {
                    return Err(QueueSaturatedError {
                        capacity: self.capacity,
                    });
                }
            }
        }
        Ok(permits)
    }

    /// Hand an admitted request to the dispatcher.
    ///
    /// Fails only when the dispatcher has stopped accepting work; the
    /// channel can never be full while the caller holds one of the
    /// `capacity` permits.
    pub fn push(
        &self,
        request: Arc<DeliveryRequest>,
        permit: OwnedSemaphorePermit,
    ) -> Result<(), QueueClosedError> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let queued = QueuedRequest {
            request,
            seq,
            permit,
        };

        match self.tx.try_send(queued) {
            Ok(()) => {
                self.gauges.buffered.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(QueueClosedError),
            Err(TrySendError::Full(_)) => {
                tracing::error!("delivery channel full despite a held capacity permit");
                Err(QueueClosedError)
            }
        }
    }

    /// Whether the dispatcher still accepts work.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            capacity: self.capacity,
            available: self.permits.available_permits(),
            buffered: self.gauges.buffered.load(Ordering::Relaxed),
            in_flight: self.gauges.in_flight.load(Ordering::Relaxed),
        }
    }
}
