//! Shared vocabulary for the herald notification engine.
//!
//! Every crate in the workspace speaks in these types: delivery channels and
//! priorities, identifier newtypes, the delivery status state machine, the
//! template variable map, and the shutdown signal.

pub mod channel;
pub mod ids;
pub mod logging;
pub mod priority;
pub mod status;
pub mod variables;

pub use channel::{Channel, ChannelSet, ParseChannelError};
pub use ids::{EventKey, Recipient, RequestId};
pub use priority::Priority;
pub use status::{AttemptOutcome, DeliveryAttempt, DeliveryStatus};
pub use variables::Variables;

pub use tracing;

/// Control signal broadcast to long-running tasks.
#[derive(Debug, Clone, Copy)]
pub enum Signal {
    /// Stop accepting work, drain what is in flight, then exit.
    Shutdown,
}
