//! Delivery machinery for the herald notification engine.
//!
//! Admission is synchronous: capacity reservation against the bounded
//! [`queue::DeliveryQueue`], channel resolution through [`router`], and the
//! dedup check in the [`ledger::DeliveryLedger`] all complete inline on the
//! caller's thread. Everything after admission is asynchronous: the
//! [`dispatcher::Dispatcher`] pulls admitted requests off the queue in
//! priority order and drives each one through a [`adapter::ChannelAdapter`]
//! with retries until it reaches a terminal status.
//!
//! The ledger is the only writer of delivery state. Workers and producers
//! go through it for every transition, which is what makes duplicate
//! suppression and the append-only attempt log trustworthy.

pub mod adapter;
pub mod dispatcher;
pub mod error;
pub mod ledger;
pub mod queue;
pub mod retry;
pub mod router;
pub mod service;
pub mod types;

mod worker;

pub use adapter::{AdapterSet, ChannelAdapter, CompletionHook};
pub use dispatcher::{DispatchConfig, Dispatcher, DispatcherHandle, DrainSummary};
pub use error::{AdapterError, InvalidChannelError, QueueClosedError, QueueSaturatedError};
pub use ledger::{Admission, DeliveryLedger, LedgerStats, RequestRecord};
pub use queue::DeliveryQueue;
pub use retry::RetryPolicy;
pub use router::{ChannelPreferences, StaticPreferences, resolve};
pub use service::DeliveryQueryService;
pub use types::{DedupKey, DeliveryRequest, QueueStats};
