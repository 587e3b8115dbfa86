//! The dispatch loop: priority scheduling into a bounded worker pool.
//!
//! The dispatcher owns the receiving end of the delivery queue. Requests
//! are buffered in a priority heap (higher priority first, FIFO within a
//! priority) and handed to a [`tokio::task::JoinSet`] capped at the
//! configured worker count. A periodic tick prunes expired dedup
//! admissions. On shutdown the backlog is exhausted immediately, in-flight
//! deliveries get a grace period, and whatever is left is aborted and
//! exhausted.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};

use herald_common::{DeliveryStatus, Signal};
use herald_registry::EventRegistry;

use crate::adapter::{AdapterSet, CompletionHook};
use crate::ledger::DeliveryLedger;
use crate::queue::{DeliveryQueue, QueueGauges, QueuedRequest};
use crate::retry::RetryPolicy;
use crate::worker::{self, WorkerContext};

/// Queue and worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Concurrent deliveries.
    #[serde(default = "defaults::workers")]
    pub workers: usize,

    /// Total pipeline capacity: waiting, buffered, and in-flight requests
    /// together. Admissions beyond it fail fast.
    #[serde(default = "defaults::queue_capacity")]
    pub queue_capacity: usize,

    /// How long shutdown waits for in-flight deliveries, in milliseconds.
    #[serde(default = "defaults::shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// How often expired dedup admissions are pruned, in seconds.
    #[serde(default = "defaults::prune_interval_secs")]
    pub prune_interval_secs: u64,

    /// Retry policy for transient failures.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: defaults::workers(),
            queue_capacity: defaults::queue_capacity(),
            shutdown_grace_ms: defaults::shutdown_grace_ms(),
            prune_interval_secs: defaults::prune_interval_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

mod defaults {
    pub(super) fn workers() -> usize {
        num_cpus::get().min(8)
    }

    pub(super) const fn queue_capacity() -> usize {
        256
    }

    pub(super) const fn shutdown_grace_ms() -> u64 {
        5_000
    }

    pub(super) const fn prune_interval_secs() -> u64 {
        60
    }
}

/// What happened to outstanding work during shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainSummary {
    /// In-flight deliveries that concluded within the grace period.
    pub completed_in_grace: usize,
    /// Requests marked exhausted: the undispatched backlog plus anything
    /// aborted at the grace deadline.
    pub exhausted: usize,
}

/// Everything the dispatcher needs to run.
#[derive(Debug)]
pub struct Dispatcher {
    pub config: DispatchConfig,
    pub registry: Arc<EventRegistry>,
    pub adapters: AdapterSet,
    pub ledger: DeliveryLedger,
    pub completion_hook: Option<Arc<dyn CompletionHook>>,
    /// Dedup window used when pruning expired admissions, in seconds.
    pub dedup_window_secs: u64,
}

impl Dispatcher {
    /// Start the dispatch loop on the current runtime.
    ///
    /// Returns the producer handle for admissions and the handle that shuts
    /// the loop down. Dropping the [`DispatcherHandle`] leaves the loop
    /// running; it stops on its own once every producer handle is gone.
    #[must_use]
    pub fn spawn(self) -> (DeliveryQueue, DispatcherHandle) {
        let (queue, rx) = DeliveryQueue::bounded(self.config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(8);

        let ctx = Arc::new(WorkerContext {
            registry: self.registry,
            adapters: self.adapters,
            ledger: self.ledger,
            retry: self.config.retry,
            hook: self.completion_hook,
        });

        let dispatch_loop = DispatchLoop {
            rx,
            ctx,
            workers: self.config.workers.max(1),
            grace: Duration::from_millis(self.config.shutdown_grace_ms),
            prune_interval: Duration::from_secs(self.config.prune_interval_secs.max(1)),
            dedup_window_secs: self.dedup_window_secs,
            gauges: queue.gauges(),
            shutdown_tx: shutdown_tx.clone(),
            shutdown_rx,
            buffer: BinaryHeap::new(),
            pool: JoinSet::new(),
            summary: DrainSummary::default(),
        };

        let task = tokio::spawn(dispatch_loop.run());

        (
            queue,
            DispatcherHandle {
                shutdown: shutdown_tx,
                task,
            },
        )
    }
}

/// Handle for stopping a running dispatcher.
#[derive(Debug)]
pub struct DispatcherHandle {
    shutdown: broadcast::Sender<Signal>,
    task: JoinHandle<DrainSummary>,
}

impl DispatcherHandle {
    /// Signal shutdown and wait for the drain to finish.
    ///
    /// The backlog is exhausted immediately, in-flight deliveries get the
    /// configured grace period, then the rest is aborted and exhausted.
    pub async fn shutdown(self) -> DrainSummary {
        // Err means the loop already stopped, which is fine.
        let _ = self.shutdown.send(Signal::Shutdown);

        match self.task.await {
            Ok(summary) => summary,
            Err(err) => {
                tracing::error!("dispatch loop did not stop cleanly: {err}");
                DrainSummary::default()
            }
        }
    }
}

/// Heap ordering: higher priority first, FIFO by sequence within equal
/// priorities.
struct HeapEntry(QueuedRequest);

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.0
            .request
            .priority
            .cmp(&other.0.request.priority)
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for HeapEntry {}

struct DispatchLoop {
    rx: mpsc::Receiver<QueuedRequest>,
    ctx: Arc<WorkerContext>,
    workers: usize,
    grace: Duration,
    prune_interval: Duration,
    dedup_window_secs: u64,
    gauges: Arc<QueueGauges>,
    shutdown_tx: broadcast::Sender<Signal>,
    shutdown_rx: broadcast::Receiver<Signal>,
    buffer: BinaryHeap<HeapEntry>,
    pool: JoinSet<()>,
    summary: DrainSummary,
}

impl DispatchLoop {
    async fn run(mut self) -> DrainSummary {
        tracing::info!(workers = self.workers, "dispatcher started");

        let mut prune = tokio::time::interval(self.prune_interval);
        prune.tick().await; // the first tick completes immediately

        loop {
            self.refill();

            tokio::select! {
                _ = self.shutdown_rx.recv() => break,

                received = self.rx.recv() => match received {
                    Some(queued) => self.buffer.push(HeapEntry(queued)),
                    // every producer handle is gone, nothing more can arrive
                    None => break,
                },

                Some(_) = self.pool.join_next(), if !self.pool.is_empty() => {
                    self.gauges.in_flight.fetch_sub(1, Ordering::Relaxed);
                }

                _ = prune.tick() => {
                    self.ctx
                        .ledger
                        .prune_expired(self.dedup_window_secs, SystemTime::now());
                }
            }
        }

        self.drain().await
    }

    /// Hand buffered requests to workers while worker slots are free.
    fn refill(&mut self) {
        while self.pool.len() < self.workers {
            let Some(entry) = self.buffer.pop() else { break };
            self.spawn_worker(entry);
        }
    }

    fn spawn_worker(&mut self, entry: HeapEntry) {
        let QueuedRequest {
            request, permit, ..
        } = entry.0;

        self.gauges.buffered.fetch_sub(1, Ordering::Relaxed);
        self.gauges.in_flight.fetch_add(1, Ordering::Relaxed);

        let ctx = Arc::clone(&self.ctx);
        let shutdown = self.shutdown_tx.subscribe();
        self.pool.spawn(async move {
            worker::deliver(ctx, request, shutdown).await;
            drop(permit);
        });
    }

    /// Refuse new work, exhaust the backlog, wait out the grace period,
    /// abort the rest.
    async fn drain(mut self) -> DrainSummary {
        self.rx.close();

        while let Ok(queued) = self.rx.try_recv() {
            self.buffer.push(HeapEntry(queued));
        }

        let backlog = self.buffer.len();
        while let Some(entry) = self.buffer.pop() {
            let status = self.ctx.ledger.mark_exhausted(&entry.0.request.id);
            if matches!(status, Some(DeliveryStatus::Exhausted)) {
                self.summary.exhausted += 1;
            }
            self.gauges.buffered.fetch_sub(1, Ordering::Relaxed);
            // the entry's permit drops here, releasing its capacity
        }
        if backlog > 0 {
            tracing::warn!("shutdown with {backlog} undispatched requests, marked exhausted");
        }

        let deadline = tokio::time::Instant::now() + self.grace;
        loop {
            match tokio::time::timeout_at(deadline, self.pool.join_next()).await {
                Ok(Some(_)) => {
                    self.summary.completed_in_grace += 1;
                    self.gauges.in_flight.fetch_sub(1, Ordering::Relaxed);
                }
                Ok(None) => break,
                Err(_) => {
                    let aborted = self.pool.len();
                    tracing::warn!(
                        "shutdown grace expired, aborting {aborted} in-flight deliveries"
                    );
                    self.pool.abort_all();
                    while self.pool.join_next().await.is_some() {
                        self.gauges.in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                    break;
                }
            }
        }

        // Anything still pending can never be delivered now.
        self.summary.exhausted += self.ctx.ledger.exhaust_pending();

        tracing::info!(
            "dispatcher drained: {} completed in grace, {} exhausted",
            self.summary.completed_in_grace,
            self.summary.exhausted
        );
        self.summary
    }
}
