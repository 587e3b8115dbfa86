//! The engine facade: admission, queries, shutdown.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;

use herald_common::{
    Channel, ChannelSet, DeliveryAttempt, DeliveryStatus, EventKey, Recipient, RequestId,
    Variables, admission,
};
use herald_dispatch::adapter::{AdapterSet, ChannelAdapter, CompletionHook};
use herald_dispatch::dispatcher::{DispatchConfig, Dispatcher, DispatcherHandle, DrainSummary};
use herald_dispatch::error::{InvalidChannelError, QueueSaturatedError};
use herald_dispatch::ledger::{Admission, DeliveryLedger, LedgerStats};
use herald_dispatch::queue::DeliveryQueue;
use herald_dispatch::router::{self, ChannelPreferences};
use herald_dispatch::service::DeliveryQueryService;
use herald_dispatch::types::{DeliveryRequest, QueueStats};
use herald_registry::{EventRegistry, UnknownEventError};

/// Engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Dedup window in seconds: identical requests admit at most once per
    /// window unless the current holder failed terminally.
    #[serde(default = "defaults::dedup_window_secs")]
    pub dedup_window_secs: u64,

    /// Queue, worker pool, and retry configuration.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            dedup_window_secs: defaults::dedup_window_secs(),
            dispatch: DispatchConfig::default(),
        }
    }
}

mod defaults {
    pub(super) const fn dedup_window_secs() -> u64 {
        300
    }
}

/// One producer call: who to notify and with what payload.
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub recipient: Recipient,
    pub variables: Variables,
    /// Bypasses preferences and the event default. Must be a non-empty
    /// subset of the event's allowed channels.
    pub channel_override: Option<ChannelSet>,
}

impl SendRequest {
    #[must_use]
    pub fn to(recipient: impl Into<Recipient>) -> Self {
        Self {
            recipient: recipient.into(),
            variables: Variables::new(),
            channel_override: None,
        }
    }

    /// Add one template variable.
    #[must_use]
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.set(name, value);
        self
    }

    /// Replace the whole variable map.
    #[must_use]
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Restrict delivery to exactly these channels.
    #[must_use]
    pub fn only_channels(mut self, channels: impl Into<ChannelSet>) -> Self {
        self.channel_override = Some(channels.into());
        self
    }
}

/// Synchronous admission failures surfaced to producers.
///
/// Everything that can go wrong after admission (render failures, adapter
/// failures, exhaustion) is asynchronous and observable through
/// [`Orchestrator::status_of`], never through [`Orchestrator::send`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    UnknownEvent(#[from] UnknownEventError),

    #[error(transparent)]
    InvalidChannel(#[from] InvalidChannelError),

    #[error(transparent)]
    QueueSaturated(#[from] QueueSaturatedError),
}

/// Per-channel admission outcome of one [`Orchestrator::send`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionResult {
    pub event_key: EventKey,
    /// One entry per effective channel, in routing order.
    pub admissions: Vec<ChannelAdmission>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelAdmission {
    pub channel: Channel,
    pub decision: AdmissionDecision,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionDecision {
    /// Committed: this request will reach a terminal status.
    Admitted { request_id: RequestId },
    /// An identical request already holds the dedup slot for this window.
    Duplicate {
        existing: RequestId,
        status: DeliveryStatus,
    },
}

impl AdmissionResult {
    /// Ids of the requests this call admitted, in routing order.
    pub fn admitted_ids(&self) -> impl Iterator<Item = RequestId> {
        self.admissions
            .iter()
            .filter_map(|admission| match admission.decision {
                AdmissionDecision::Admitted { request_id } => Some(request_id),
                AdmissionDecision::Duplicate { .. } => None,
            })
    }

    /// The decision for one channel, if it was part of the effective set.
    #[must_use]
    pub fn channel(&self, channel: Channel) -> Option<&AdmissionDecision> {
        self.admissions
            .iter()
            .find(|admission| admission.channel == channel)
            .map(|admission| &admission.decision)
    }

    /// Whether every effective channel was suppressed as a duplicate.
    #[must_use]
    pub fn all_duplicates(&self) -> bool {
        self.admissions
            .iter()
            .all(|admission| matches!(admission.decision, AdmissionDecision::Duplicate { .. }))
    }
}

/// The notification engine facade.
///
/// Constructed explicitly via [`Orchestrator::builder`] with its registry,
/// adapters, and configuration; there is no global instance. Cloning is
/// cheap and every clone drives the same engine.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    registry: Arc<EventRegistry>,
    ledger: DeliveryLedger,
    queue: DeliveryQueue,
    preferences: Option<Arc<dyn ChannelPreferences>>,
    dedup_window_secs: u64,
    handle: Mutex<Option<DispatcherHandle>>,
}

impl Orchestrator {
    #[must_use]
    pub fn builder(registry: Arc<EventRegistry>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            registry,
            adapters: AdapterSet::new(),
            preferences: None,
            completion_hook: None,
            config: OrchestratorConfig::default(),
        }
    }

    /// Admit a notification for delivery on every effective channel.
    ///
    /// Synchronous and never suspending: event lookup, channel resolution,
    /// capacity reservation, dedup admission, and enqueue all happen inline
    /// on the caller's thread. Admission is all-or-nothing per call: on
    /// saturation, no channel of this call is admitted. Once `Ok` is
    /// returned, every admitted request is a commitment that will conclude
    /// in a terminal status observable via [`Self::status_of`].
    pub fn send(
        &self,
        event_key: impl Into<EventKey>,
        request: SendRequest,
    ) -> Result<AdmissionResult, SendError> {
        let event_key = event_key.into();
        let event = self.inner.registry.lookup(&event_key)?;

        let preference = self
            .inner
            .preferences
            .as_deref()
            .and_then(|preferences| preferences.channels_for(&request.recipient));
        let channels = router::resolve(
            event,
            request.channel_override.as_ref(),
            preference.as_ref(),
        )?;

        // Capacity for the whole call is claimed up front so saturation can
        // never leave a half-admitted call behind.
        let permits = self.inner.queue.try_reserve(channels.len())?;

        let mut admissions = Vec::with_capacity(channels.len());
        for (channel, permit) in channels.iter().zip(permits) {
            let delivery = DeliveryRequest::new(
                event_key.clone(),
                request.recipient.clone(),
                channel,
                request.variables.clone(),
                event.priority,
                self.inner.dedup_window_secs,
            );

            match self.inner.ledger.admit(&delivery) {
                Admission::Admitted => {
                    let request_id = delivery.id;
                    admission!(
                        level = DEBUG,
                        "admitted {request_id} for {event_key} on {channel}"
                    );

                    if let Err(err) = self.inner.queue.push(Arc::new(delivery), permit) {
                        // Shutdown raced this call; the admission still has
                        // to conclude, so exhaust it instead of dropping it.
                        admission!(
                            level = WARN,
                            "enqueue of {request_id} refused ({err}), marking exhausted"
                        );
                        self.inner.ledger.mark_exhausted(&request_id);
                    }

                    admissions.push(ChannelAdmission {
                        channel,
                        decision: AdmissionDecision::Admitted { request_id },
                    });
                }
                Admission::Duplicate { existing, status } => {
                    admission!(
                        level = DEBUG,
                        "duplicate of {existing} suppressed for {event_key} on {channel}"
                    );
                    admissions.push(ChannelAdmission {
                        channel,
                        decision: AdmissionDecision::Duplicate { existing, status },
                    });
                    // the unused permit drops here, releasing its capacity
                }
            }
        }

        Ok(AdmissionResult {
            event_key,
            admissions,
        })
    }

    /// Current status of a request, or `None` for an unknown id.
    #[must_use]
    pub fn status_of(&self, request_id: &RequestId) -> Option<DeliveryStatus> {
        self.inner.ledger.status_of(request_id)
    }

    /// Append-only attempt log of a request, or `None` for an unknown id.
    #[must_use]
    pub fn attempts_of(&self, request_id: &RequestId) -> Option<Vec<DeliveryAttempt>> {
        self.inner.ledger.attempts_of(request_id)
    }

    /// Counts per status across every record.
    #[must_use]
    pub fn ledger_stats(&self) -> LedgerStats {
        self.inner.ledger.stats()
    }

    /// Point-in-time queue gauges.
    #[must_use]
    pub fn queue_stats(&self) -> QueueStats {
        self.inner.queue.stats()
    }

    /// Read-only view of delivery state for operational tooling.
    #[must_use]
    pub fn query_service(&self) -> Arc<dyn DeliveryQueryService> {
        Arc::new(self.inner.ledger.clone())
    }

    /// The registry this engine was built with.
    #[must_use]
    pub fn registry(&self) -> &EventRegistry {
        &self.inner.registry
    }

    /// Stop the engine: close intake, drain in-flight deliveries within the
    /// configured grace period, and exhaust whatever could not conclude.
    ///
    /// `send` keeps failing once intake is closed. Repeated shutdowns
    /// return an empty summary.
    pub async fn shutdown(&self) -> DrainSummary {
        let handle = self.inner.handle.lock().await.take();
        match handle {
            Some(handle) => handle.shutdown().await,
            None => DrainSummary::default(),
        }
    }
}

/// Assembles an [`Orchestrator`].
#[derive(Debug)]
pub struct OrchestratorBuilder {
    registry: Arc<EventRegistry>,
    adapters: AdapterSet,
    preferences: Option<Arc<dyn ChannelPreferences>>,
    completion_hook: Option<Arc<dyn CompletionHook>>,
    config: OrchestratorConfig,
}

impl OrchestratorBuilder {
    /// Register the transport for a channel.
    #[must_use]
    pub fn adapter(mut self, channel: Channel, adapter: Arc<dyn ChannelAdapter>) -> Self {
        self.adapters.register(channel, adapter);
        self
    }

    /// Source of per-recipient channel preferences.
    #[must_use]
    pub fn preferences(mut self, preferences: Arc<dyn ChannelPreferences>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Callback fired once per request on reaching a terminal status.
    #[must_use]
    pub fn completion_hook(mut self, hook: Arc<dyn CompletionHook>) -> Self {
        self.completion_hook = Some(hook);
        self
    }

    #[must_use]
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawn the dispatcher and hand back the ready engine.
    ///
    /// Must be called from within a Tokio runtime; the dispatch loop starts
    /// immediately.
    #[must_use]
    pub fn build(self) -> Orchestrator {
        let ledger = DeliveryLedger::new();
        let dedup_window_secs = self.config.dedup_window_secs.max(1);

        let (queue, handle) = Dispatcher {
            config: self.config.dispatch,
            registry: Arc::clone(&self.registry),
            adapters: self.adapters,
            ledger: ledger.clone(),
            completion_hook: self.completion_hook,
            dedup_window_secs,
        }
        .spawn();

        Orchestrator {
            inner: Arc::new(Inner {
                registry: self.registry,
                ledger,
                queue,
                preferences: self.preferences,
                dedup_window_secs,
                handle: Mutex::new(Some(handle)),
            }),
        }
    }
}
