//! Multi-channel notification orchestration for the platform.
//!
//! Domain services (auth flows, analytics jobs, the AI tutor) announce that
//! a user should be notified; this crate owns everything after that call:
//! event lookup, channel resolution, duplicate suppression, bounded
//! queueing, template rendering, adapter delivery with bounded retries, and
//! an append-only ledger exposing per-request delivery status.
//!
//! Admission is synchronous and never suspends; delivery is asynchronous on
//! a fixed worker pool. Producers get back per-channel admission decisions
//! immediately and observe delivery outcomes through
//! [`Orchestrator::status_of`] or a [`CompletionHook`].
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use herald::domain::AuthNotifier;
//! use herald::inbox::InAppInbox;
//! use herald::{Channel, Orchestrator, catalog};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     herald::logging::init();
//!
//!     let registry = Arc::new(catalog::platform_registry()?);
//!     let inbox = Arc::new(InAppInbox::new());
//!
//!     // Email and push transports register the same way.
//!     let orchestrator = Orchestrator::builder(registry)
//!         .adapter(Channel::InApp, Arc::clone(&inbox) as _)
//!         .build();
//!
//!     let auth = AuthNotifier::new(orchestrator.clone());
//!     let result = auth.account_created("user-77", "Ana", "https://example.com/confirm/77")?;
//!     for id in result.admitted_ids() {
//!         println!("admitted {id}: {:?}", orchestrator.status_of(&id));
//!     }
//!
//!     orchestrator.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod domain;
pub mod inbox;
pub mod orchestrator;

pub use herald_common::{
    AttemptOutcome, Channel, ChannelSet, DeliveryAttempt, DeliveryStatus, EventKey, Priority,
    Recipient, RequestId, Variables, logging,
};
pub use herald_dispatch::{
    AdapterError, AdapterSet, ChannelAdapter, ChannelPreferences, CompletionHook, DeliveryLedger,
    DeliveryQueryService, DeliveryRequest, DispatchConfig, DrainSummary, InvalidChannelError,
    LedgerStats, QueueSaturatedError, QueueStats, RetryPolicy, StaticPreferences,
};
pub use herald_registry::{
    EventDefinition, EventRegistry, EventRegistryBuilder, NotificationEvent, RegistryError,
    RenderedContent, Template, UnknownEventError,
};
pub use inbox::{InAppInbox, InboxMessage};
pub use orchestrator::{
    AdmissionDecision, AdmissionResult, ChannelAdmission, Orchestrator, OrchestratorBuilder,
    OrchestratorConfig, SendError, SendRequest,
};
